//! Test record types.

use std::collections::BTreeSet;

use attrmap_blob::{BlobKind, BlobSpec, FetchPolicy};
use attrmap_types::ScalarType;
use chrono::{DateTime, FixedOffset, TimeZone};

use crate::descriptor::{DescriptorRegistry, EntityDescriptor};
use crate::error::{MapperError, MapperResult};
use crate::record::{set_field, take, BlobPayload, FieldMap, FieldValue, LazyBlob, Record};

pub const BOOK_BUCKET: &str = "book-blobs";

#[derive(Clone, Debug, PartialEq)]
pub struct Book {
    pub id: i64,
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub authors: BTreeSet<String>,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub price: Option<i32>,
    pub height: Option<f32>,
    pub width: Option<f32>,
    pub available: bool,
    /// Eager text blob.
    pub review: Option<String>,
    /// Lazy binary blob.
    pub cover_image: LazyBlob<Vec<u8>>,
    pub version: Option<i64>,
}

impl Record for Book {
    fn fields(&self) -> FieldMap {
        let mut f = FieldMap::new();
        f.insert("id".into(), Some(self.id).into());
        f.insert("title".into(), self.title.clone().into());
        f.insert("isbn".into(), self.isbn.clone().into());
        f.insert("authors".into(), set_field(self.authors.iter().cloned()));
        f.insert("published_at".into(), self.published_at.into());
        f.insert("price".into(), self.price.into());
        f.insert("height".into(), self.height.into());
        f.insert("width".into(), self.width.into());
        f.insert("available".into(), Some(self.available).into());
        f.insert(
            "review".into(),
            self.review.as_ref().map_or(FieldValue::Null, BlobPayload::to_field),
        );
        f.insert("cover_image".into(), self.cover_image.to_field());
        f.insert("version".into(), self.version.into());
        f
    }

    fn from_fields(mut f: FieldMap) -> MapperResult<Self> {
        Ok(Book {
            id: take::int64(&mut f, "id")?
                .ok_or_else(|| MapperError::MalformedValue("book without id".into()))?,
            title: take::text(&mut f, "title")?,
            isbn: take::text(&mut f, "isbn")?,
            authors: take::text_set(&mut f, "authors")?,
            published_at: take::timestamp(&mut f, "published_at")?,
            price: take::int32(&mut f, "price")?,
            height: take::float32(&mut f, "height")?,
            width: take::float32(&mut f, "width")?,
            available: take::boolean(&mut f, "available")?.unwrap_or_default(),
            review: take::blob(&mut f, "review")?,
            cover_image: take::lazy_blob(&mut f, "cover_image")?,
            version: take::int64(&mut f, "version")?,
        })
    }

    fn stamp_version(&mut self, _field: &str, version: i64) -> MapperResult<()> {
        self.version = Some(version);
        Ok(())
    }
}

pub fn book_descriptor() -> EntityDescriptor {
    EntityDescriptor::builder("Book")
        .domain("books")
        .key("id", ScalarType::Int64)
        .attribute("title", ScalarType::Text)
        .attribute("isbn", ScalarType::Text)
        .set_attribute("authors", ScalarType::Text)
        .attribute_named("published_at", "publishedAt", ScalarType::Timestamp)
        .attribute("price", ScalarType::Int32)
        .attribute("height", ScalarType::Float32)
        .attribute("width", ScalarType::Float32)
        .attribute("available", ScalarType::Boolean)
        .version("version")
        .blob(
            BlobSpec::new("review", BOOK_BUCKET, BlobKind::Text)
                .key_prefix("books")
                .content_type("text/plain")
                .fetch(FetchPolicy::Eager),
        )
        .blob(
            BlobSpec::new("cover_image", BOOK_BUCKET, BlobKind::Bytes)
                .attribute("coverImage")
                .key_prefix("books/")
                .content_type("image/jpeg")
                .fetch(FetchPolicy::Lazy),
        )
        .build()
        .expect("book descriptor is valid")
}

pub fn registry() -> DescriptorRegistry {
    DescriptorRegistry::new().with::<Book>(book_descriptor())
}

pub fn sample_book(id: i64) -> Book {
    let published = FixedOffset::east_opt(9 * 3600)
        .and_then(|tz| tz.with_ymd_and_hms(2019, 8, 12, 0, 0, 0).single())
        .expect("valid date");
    Book {
        id,
        title: Some("The Rust Book".into()),
        isbn: Some("978-1718503106".into()),
        authors: ["Steve", "Carol"].into_iter().map(String::from).collect(),
        published_at: Some(published),
        price: Some(3980),
        height: Some(23.5),
        width: Some(17.8),
        available: true,
        review: Some("A fine read.".into()),
        cover_image: LazyBlob::Loaded(vec![0x89, b'P', b'N', b'G']),
        version: None,
    }
}

/// A record type with no version field and a text key.
#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub slug: String,
    pub body: Option<String>,
    pub tags: BTreeSet<String>,
}

impl Record for Note {
    fn fields(&self) -> FieldMap {
        let mut f = FieldMap::new();
        f.insert("slug".into(), Some(self.slug.clone()).into());
        f.insert("body".into(), self.body.clone().into());
        f.insert("tags".into(), set_field(self.tags.iter().cloned()));
        f
    }

    fn from_fields(mut f: FieldMap) -> MapperResult<Self> {
        Ok(Note {
            slug: take::text(&mut f, "slug")?.unwrap_or_default(),
            body: take::text(&mut f, "body")?,
            tags: take::text_set(&mut f, "tags")?,
        })
    }
}

pub fn note_descriptor() -> EntityDescriptor {
    EntityDescriptor::builder("Note")
        .domain("notes")
        .key("slug", ScalarType::Text)
        .attribute("body", ScalarType::Text)
        .set_attribute("tags", ScalarType::Text)
        .build()
        .expect("note descriptor is valid")
}

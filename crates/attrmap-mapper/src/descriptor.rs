//! Entity descriptors: how a record type maps onto a domain.

use std::any::{type_name, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use attrmap_blob::BlobSpec;
use attrmap_types::ScalarType;

use crate::error::{MapperError, MapperResult};
use crate::record::Record;

/// Default attribute name of the version field.
pub const DEFAULT_VERSION_ATTRIBUTE: &str = "version";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Scalar,
    Set,
}

/// A mapped attribute field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeSpec {
    pub field: String,
    /// Attribute name in the store.
    pub name: String,
    pub kind: AttributeKind,
    pub scalar_type: ScalarType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySpec {
    pub field: String,
    pub scalar_type: ScalarType,
}

/// Optimistic-concurrency version field. Always `int64`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionSpec {
    pub field: String,
    pub attribute: String,
}

/// Everything the mapper needs to know about one record type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityDescriptor {
    name: String,
    domain: String,
    key: KeySpec,
    attributes: Vec<AttributeSpec>,
    version: Option<VersionSpec>,
    blobs: Vec<BlobSpec>,
}

impl EntityDescriptor {
    pub fn builder(name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn key(&self) -> &KeySpec {
        &self.key
    }

    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    pub fn version(&self) -> Option<&VersionSpec> {
        self.version.as_ref()
    }

    pub fn blobs(&self) -> &[BlobSpec] {
        &self.blobs
    }

    /// Attribute spec for a store attribute name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Blob spec for a record field name.
    pub fn blob_for_field(&self, field: &str) -> Option<&BlobSpec> {
        self.blobs.iter().find(|b| b.field == field)
    }
}

/// Builds and validates an [`EntityDescriptor`].
#[derive(Clone, Debug)]
pub struct DescriptorBuilder {
    name: String,
    domain: Option<String>,
    key: Option<KeySpec>,
    attributes: Vec<AttributeSpec>,
    version: Option<VersionSpec>,
    blobs: Vec<BlobSpec>,
}

impl DescriptorBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: None,
            key: None,
            attributes: Vec::new(),
            version: None,
            blobs: Vec::new(),
        }
    }

    /// Domain name. Defaults to the entity name.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn key(mut self, field: impl Into<String>, scalar_type: ScalarType) -> Self {
        self.key = Some(KeySpec {
            field: field.into(),
            scalar_type,
        });
        self
    }

    /// A scalar attribute named after its field.
    pub fn attribute(self, field: impl Into<String>, scalar_type: ScalarType) -> Self {
        let field = field.into();
        self.push(field.clone(), field, AttributeKind::Scalar, scalar_type)
    }

    /// A scalar attribute stored under a different name than its field.
    pub fn attribute_named(
        self,
        field: impl Into<String>,
        name: impl Into<String>,
        scalar_type: ScalarType,
    ) -> Self {
        self.push(field.into(), name.into(), AttributeKind::Scalar, scalar_type)
    }

    /// A set-valued attribute named after its field.
    pub fn set_attribute(self, field: impl Into<String>, scalar_type: ScalarType) -> Self {
        let field = field.into();
        self.push(field.clone(), field, AttributeKind::Set, scalar_type)
    }

    pub fn set_attribute_named(
        self,
        field: impl Into<String>,
        name: impl Into<String>,
        scalar_type: ScalarType,
    ) -> Self {
        self.push(field.into(), name.into(), AttributeKind::Set, scalar_type)
    }

    /// Version field stored under [`DEFAULT_VERSION_ATTRIBUTE`].
    pub fn version(self, field: impl Into<String>) -> Self {
        self.version_named(field, DEFAULT_VERSION_ATTRIBUTE)
    }

    pub fn version_named(mut self, field: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.version = Some(VersionSpec {
            field: field.into(),
            attribute: attribute.into(),
        });
        self
    }

    pub fn blob(mut self, spec: BlobSpec) -> Self {
        self.blobs.push(spec);
        self
    }

    fn push(mut self, field: String, name: String, kind: AttributeKind, scalar_type: ScalarType) -> Self {
        self.attributes.push(AttributeSpec {
            field,
            name,
            kind,
            scalar_type,
        });
        self
    }

    pub fn build(self) -> MapperResult<EntityDescriptor> {
        let invalid = |reason: String| MapperError::InvalidDescriptor {
            entity: self.name.clone(),
            reason,
        };

        let key = self.key.clone().ok_or_else(|| invalid("no key field declared".into()))?;
        if !key.scalar_type.is_key_type() {
            return Err(MapperError::UnsupportedKeyType(key.scalar_type));
        }
        let domain = self.domain.clone().unwrap_or_else(|| self.name.clone());
        if domain.is_empty() {
            return Err(invalid("domain name is empty".into()));
        }

        let mut names: HashSet<&str> = HashSet::new();
        let mut fields: HashSet<&str> = HashSet::from([key.field.as_str()]);
        let attribute_names = self
            .attributes
            .iter()
            .map(|a| (a.field.as_str(), a.name.as_str()))
            .chain(self.version.iter().map(|v| (v.field.as_str(), v.attribute.as_str())))
            .chain(self.blobs.iter().map(|b| (b.field.as_str(), b.attribute.as_str())));
        for (field, name) in attribute_names {
            if name.is_empty() || field.is_empty() {
                return Err(invalid("field and attribute names must be non-empty".into()));
            }
            if !names.insert(name) {
                return Err(invalid(format!("attribute name {name} declared twice")));
            }
            if !fields.insert(field) {
                return Err(invalid(format!("field {field} mapped twice")));
            }
        }
        if let Some(blob) = self.blobs.iter().find(|b| b.bucket.trim().is_empty()) {
            return Err(invalid(format!("blob field {} has no bucket", blob.field)));
        }

        Ok(EntityDescriptor {
            name: self.name,
            domain,
            key,
            attributes: self.attributes,
            version: self.version,
            blobs: self.blobs,
        })
    }
}

/// Descriptors keyed by record type.
#[derive(Clone, Debug, Default)]
pub struct DescriptorRegistry {
    entries: HashMap<TypeId, Arc<EntityDescriptor>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the descriptor for `R`.
    pub fn register<R: Record>(&mut self, descriptor: EntityDescriptor) -> &mut Self {
        self.entries.insert(TypeId::of::<R>(), Arc::new(descriptor));
        self
    }

    pub fn with<R: Record>(mut self, descriptor: EntityDescriptor) -> Self {
        self.register::<R>(descriptor);
        self
    }

    pub fn get<R: Record>(&self) -> MapperResult<Arc<EntityDescriptor>> {
        self.entries
            .get(&TypeId::of::<R>())
            .cloned()
            .ok_or_else(|| MapperError::MissingDescriptor(type_name::<R>().to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldMap;
    use attrmap_blob::BlobKind;

    struct Unregistered;

    impl Record for Unregistered {
        fn fields(&self) -> FieldMap {
            FieldMap::new()
        }

        fn from_fields(_: FieldMap) -> MapperResult<Self> {
            Ok(Unregistered)
        }
    }

    #[test]
    fn build_defaults_domain_to_name() {
        let d = EntityDescriptor::builder("Note")
            .key("id", ScalarType::Text)
            .attribute("body", ScalarType::Text)
            .version("version")
            .build()
            .unwrap();
        assert_eq!(d.domain(), "Note");
        assert_eq!(d.version().unwrap().attribute, "version");
        assert_eq!(d.attribute("body").unwrap().kind, AttributeKind::Scalar);
    }

    #[test]
    fn key_is_required_and_typed() {
        let err = EntityDescriptor::builder("X").build().unwrap_err();
        assert!(matches!(err, MapperError::InvalidDescriptor { .. }));

        let err = EntityDescriptor::builder("X")
            .key("at", ScalarType::Timestamp)
            .build()
            .unwrap_err();
        assert_eq!(err, MapperError::UnsupportedKeyType(ScalarType::Timestamp));

        let err = EntityDescriptor::builder("X")
            .key("flag", ScalarType::Boolean)
            .build()
            .unwrap_err();
        assert_eq!(err, MapperError::UnsupportedKeyType(ScalarType::Boolean));
    }

    #[test]
    fn attribute_names_must_be_unique() {
        let err = EntityDescriptor::builder("X")
            .key("id", ScalarType::Int64)
            .attribute("title", ScalarType::Text)
            .blob(BlobSpec::new("body", "b", BlobKind::Text).attribute("title"))
            .build()
            .unwrap_err();
        assert!(matches!(err, MapperError::InvalidDescriptor { .. }));

        let err = EntityDescriptor::builder("X")
            .key("id", ScalarType::Int64)
            .attribute_named("a", "version", ScalarType::Text)
            .version("v")
            .build()
            .unwrap_err();
        assert!(matches!(err, MapperError::InvalidDescriptor { .. }));
    }

    #[test]
    fn blob_needs_a_bucket() {
        let err = EntityDescriptor::builder("X")
            .key("id", ScalarType::Int64)
            .blob(BlobSpec::new("body", " ", BlobKind::Text))
            .build()
            .unwrap_err();
        assert!(matches!(err, MapperError::InvalidDescriptor { .. }));
    }

    #[test]
    fn registry_reports_missing_types() {
        let registry = DescriptorRegistry::new();
        assert!(matches!(
            registry.get::<Unregistered>(),
            Err(MapperError::MissingDescriptor(name)) if name.contains("Unregistered")
        ));
    }
}

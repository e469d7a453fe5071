//! Field values to store attributes and back.

use std::collections::BTreeMap;

use attrmap_blob::{BlobKind, BlobReference, BlobSpec, BlobUpload};
use attrmap_store::Attribute;
use attrmap_types::{ScalarCodec, ScalarValue};
use bytes::Bytes;

use crate::descriptor::{AttributeKind, AttributeSpec, EntityDescriptor};
use crate::error::{MapperError, MapperResult};
use crate::record::{mismatch, FieldMap, FieldValue};
use crate::version::decode_version;

/// The wire form of a record, minus blob references and version.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EncodedRecord {
    pub key: String,
    pub attributes: Vec<Attribute>,
    /// Attribute names to clear after the put.
    pub delete_set: Vec<String>,
}

/// Output of the forward pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Assembled {
    pub record: EncodedRecord,
    /// Payloads of non-null blob fields.
    pub uploads: Vec<BlobUpload>,
    /// `(bucket, key)` of blob fields set to null; their objects are deleted.
    pub cleared_blobs: Vec<(String, String)>,
}

/// A blob reference found on read, with the field it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingBlob {
    pub spec: BlobSpec,
    pub reference: BlobReference,
}

/// Output of the reverse pass. Blob fields are absent from `fields` until
/// resolved from `blobs`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Disassembled {
    pub fields: FieldMap,
    pub blobs: Vec<PendingBlob>,
}

/// Converts between record fields and store attributes.
#[derive(Clone, Copy, Debug, Default)]
pub struct AttributeAssembler {
    codec: ScalarCodec,
}

impl AttributeAssembler {
    pub fn new(codec: ScalarCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &ScalarCodec {
        &self.codec
    }

    /// Encode a key value of the descriptor's key type.
    pub fn encode_key_value(
        &self,
        descriptor: &EntityDescriptor,
        value: &ScalarValue,
    ) -> MapperResult<String> {
        let key = descriptor.key();
        if value.scalar_type() != key.scalar_type {
            return Err(mismatch(
                &key.field,
                key.scalar_type.as_str(),
                &FieldValue::Scalar(value.clone()),
            ));
        }
        Ok(self.codec.encode_key(value)?)
    }

    /// Encode the key field of a record snapshot.
    pub fn encode_key(&self, descriptor: &EntityDescriptor, fields: &FieldMap) -> MapperResult<String> {
        let key = descriptor.key();
        match fields.get(&key.field) {
            Some(FieldValue::Scalar(value)) => self.encode_key_value(descriptor, value),
            Some(FieldValue::Null) | None => Err(MapperError::MalformedValue(format!(
                "key field {} of {} is null",
                key.field,
                descriptor.name()
            ))),
            Some(other) => Err(mismatch(&key.field, key.scalar_type.as_str(), other)),
        }
    }

    /// Forward pass: record fields to attributes, delete-set and blob work.
    ///
    /// The version attribute is not produced here.
    pub fn assemble(&self, descriptor: &EntityDescriptor, fields: &FieldMap) -> MapperResult<Assembled> {
        let key = self.encode_key(descriptor, fields)?;
        let mut out = Assembled {
            record: EncodedRecord {
                key,
                ..Default::default()
            },
            ..Default::default()
        };

        for spec in descriptor.attributes() {
            let value = fields.get(&spec.field).unwrap_or(&FieldValue::Null);
            match (spec.kind, value) {
                (_, FieldValue::Null) => out.record.delete_set.push(spec.name.clone()),
                (AttributeKind::Set, FieldValue::Set(members)) if members.is_empty() => {
                    out.record.delete_set.push(spec.name.clone())
                }
                (AttributeKind::Set, FieldValue::Set(members)) => {
                    for member in members {
                        let encoded = self.encode_scalar(spec, member)?;
                        out.record.attributes.push(Attribute::new(spec.name.clone(), encoded));
                    }
                }
                (AttributeKind::Scalar, FieldValue::Scalar(v)) => {
                    let encoded = self.encode_scalar(spec, v)?;
                    out.record.attributes.push(Attribute::new(spec.name.clone(), encoded));
                }
                (AttributeKind::Set, other) => return Err(mismatch(&spec.field, "set", other)),
                (AttributeKind::Scalar, other) => {
                    return Err(mismatch(&spec.field, spec.scalar_type.as_str(), other))
                }
            }
        }

        for spec in descriptor.blobs() {
            let object_key = spec.object_key(&out.record.key);
            let value = fields.get(&spec.field).unwrap_or(&FieldValue::Null);
            let data = match (spec.kind, value) {
                (_, FieldValue::Unloaded) => continue,
                (_, FieldValue::Null) => {
                    out.record.delete_set.push(spec.attribute.clone());
                    out.cleared_blobs.push((spec.bucket.clone(), object_key));
                    continue;
                }
                (BlobKind::Text, FieldValue::Scalar(ScalarValue::Text(s))) => {
                    Bytes::from(s.clone().into_bytes())
                }
                (BlobKind::Bytes, FieldValue::Bytes(b)) => Bytes::from(b.clone()),
                (BlobKind::Text, other) => return Err(mismatch(&spec.field, "text", other)),
                (BlobKind::Bytes, other) => return Err(mismatch(&spec.field, "bytes", other)),
            };
            out.uploads.push(BlobUpload {
                attribute: spec.attribute.clone(),
                bucket: spec.bucket.clone(),
                key: object_key,
                content_type: spec.content_type.clone(),
                data,
            });
        }

        Ok(out)
    }

    fn encode_scalar(&self, spec: &AttributeSpec, value: &ScalarValue) -> MapperResult<String> {
        if value.scalar_type() != spec.scalar_type {
            return Err(mismatch(
                &spec.field,
                spec.scalar_type.as_str(),
                &FieldValue::Scalar(value.clone()),
            ));
        }
        self.codec
            .encode(value)
            .map_err(|e| MapperError::MalformedValue(format!("{}: {e}", spec.field)))
    }

    /// Reverse pass: item name and attributes to record fields.
    ///
    /// Attributes the descriptor does not declare are ignored.
    pub fn disassemble(
        &self,
        descriptor: &EntityDescriptor,
        item_name: &str,
        attributes: &[Attribute],
    ) -> MapperResult<Disassembled> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for attr in attributes {
            grouped
                .entry(attr.name.as_str())
                .or_default()
                .push(attr.value.as_str());
        }

        let mut out = Disassembled::default();
        let key = descriptor.key();
        let key_value = self.codec.decode_key(key.scalar_type, item_name)?;
        out.fields.insert(key.field.clone(), FieldValue::Scalar(key_value));

        for spec in descriptor.attributes() {
            let values = grouped.get(spec.name.as_str()).map(Vec::as_slice).unwrap_or_default();
            let field = match (spec.kind, values) {
                (_, []) => FieldValue::Null,
                (AttributeKind::Scalar, [raw]) => FieldValue::Scalar(self.decode_scalar(spec, raw)?),
                (AttributeKind::Scalar, many) => {
                    return Err(MapperError::CardinalityMismatch {
                        attribute: spec.name.clone(),
                        count: many.len(),
                    })
                }
                (AttributeKind::Set, raws) => {
                    let mut members: Vec<ScalarValue> = Vec::with_capacity(raws.len());
                    for raw in raws {
                        let member = self.decode_scalar(spec, raw)?;
                        if !members.contains(&member) {
                            members.push(member);
                        }
                    }
                    FieldValue::Set(members)
                }
            };
            out.fields.insert(spec.field.clone(), field);
        }

        if let Some(version) = descriptor.version() {
            let field = match grouped.get(version.attribute.as_str()).map(Vec::as_slice) {
                None | Some([]) => FieldValue::Null,
                Some([raw]) => FieldValue::Scalar(ScalarValue::Int64(decode_version(&version.attribute, raw)?)),
                Some(many) => {
                    return Err(MapperError::CardinalityMismatch {
                        attribute: version.attribute.clone(),
                        count: many.len(),
                    })
                }
            };
            out.fields.insert(version.field.clone(), field);
        }

        for spec in descriptor.blobs() {
            match grouped.get(spec.attribute.as_str()).map(Vec::as_slice) {
                None | Some([]) => {
                    out.fields.insert(spec.field.clone(), FieldValue::Null);
                }
                Some([raw]) => out.blobs.push(PendingBlob {
                    spec: spec.clone(),
                    reference: BlobReference::decode_inline(&spec.attribute, raw)?,
                }),
                Some(many) => {
                    return Err(MapperError::CardinalityMismatch {
                        attribute: spec.attribute.clone(),
                        count: many.len(),
                    })
                }
            }
        }

        Ok(out)
    }

    fn decode_scalar(&self, spec: &AttributeSpec, raw: &str) -> MapperResult<ScalarValue> {
        self.codec
            .decode(spec.scalar_type, raw)
            .map_err(|e| MapperError::MalformedValue(format!("{}: {e}", spec.name)))
    }
}

/// Turn a downloaded payload into the field value for its blob kind.
pub fn blob_field(spec: &BlobSpec, data: Bytes) -> MapperResult<FieldValue> {
    match spec.kind {
        BlobKind::Bytes => Ok(FieldValue::Bytes(data.to_vec())),
        BlobKind::Text => String::from_utf8(data.to_vec())
            .map(|s| FieldValue::Scalar(ScalarValue::Text(s)))
            .map_err(|e| {
                MapperError::MalformedValue(format!("blob {} is not valid UTF-8: {e}", spec.field))
            }),
    }
}

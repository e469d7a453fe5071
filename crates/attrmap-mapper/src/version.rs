//! Optimistic concurrency for versioned records.

use std::sync::atomic::{AtomicI64, Ordering};

use attrmap_store::{Attribute, Precondition};
use attrmap_types::ScalarValue;
use chrono::Utc;

use crate::descriptor::{EntityDescriptor, VersionSpec};
use crate::error::{MapperError, MapperResult};
use crate::record::{FieldMap, FieldValue};

/// Mints strictly increasing version numbers: wall-clock milliseconds, bumped
/// past the last value handed out when the clock stalls or steps back.
#[derive(Debug, Default)]
pub struct VersionClock {
    last: AtomicI64,
}

static PROCESS_CLOCK: VersionClock = VersionClock::new();

impl VersionClock {
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// The clock shared by every mapper in the process.
    pub fn global() -> &'static VersionClock {
        &PROCESS_CLOCK
    }

    pub fn mint(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::SeqCst);
        loop {
            let next = now.max(last + 1);
            match self
                .last
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

/// What a save or delete knows about the record's stored version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionGuard {
    /// The record type has no version field.
    Unversioned,
    /// Versioned, but this copy has never been written or loaded.
    NoObservedVersion { attribute: String },
    /// This copy was read or written at `version`.
    ObservedVersion { attribute: String, version: i64 },
}

impl VersionGuard {
    /// Inspect the version field of a record snapshot.
    pub fn observe(descriptor: &EntityDescriptor, fields: &FieldMap) -> MapperResult<Self> {
        let Some(VersionSpec { field, attribute }) = descriptor.version() else {
            return Ok(VersionGuard::Unversioned);
        };
        match fields.get(field).unwrap_or(&FieldValue::Null) {
            FieldValue::Null => Ok(VersionGuard::NoObservedVersion {
                attribute: attribute.clone(),
            }),
            FieldValue::Scalar(ScalarValue::Int64(v)) => Ok(VersionGuard::ObservedVersion {
                attribute: attribute.clone(),
                version: *v,
            }),
            other => Err(crate::record::mismatch(field, "int64", other)),
        }
    }

    pub fn is_versioned(&self) -> bool {
        !matches!(self, VersionGuard::Unversioned)
    }

    /// Condition the write must carry, if any.
    pub fn precondition(&self) -> Option<Precondition> {
        match self {
            VersionGuard::ObservedVersion { attribute, version } => {
                Some(Precondition::equals(attribute.clone(), version.to_string()))
            }
            _ => None,
        }
    }

    /// Attribute carrying `new_version`, for versioned records.
    pub fn stamp(&self, new_version: i64) -> Option<Attribute> {
        match self {
            VersionGuard::Unversioned => None,
            VersionGuard::NoObservedVersion { attribute }
            | VersionGuard::ObservedVersion { attribute, .. } => {
                Some(Attribute::new(attribute.clone(), new_version.to_string()))
            }
        }
    }
}

/// Decode a stored version attribute (plain decimal).
pub fn decode_version(attribute: &str, raw: &str) -> MapperResult<i64> {
    raw.parse::<i64>().map_err(|_| {
        MapperError::MalformedValue(format!("version attribute {attribute} holds {raw:?}"))
    })
}

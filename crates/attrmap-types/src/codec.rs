//! Order-preserving string codec for scalar values.
//!
//! The store compares attribute values as byte strings, so every numeric
//! value is rendered with a fixed-width integer part:
//!
//! - non-negative numbers are zero-padded to `digits` integer digits
//!   (`5 -> "0000000005"`, `3.5 -> "0000000003.5"`);
//! - negative numbers are written as `'-'` followed by the ten's complement
//!   of the magnitude against `10^digits` (`-1 -> "-9999999999"`).
//!
//! `'-'` sorts before every digit and complementing reverses order, so
//! byte-wise order matches numeric order across the whole range whose
//! integer part fits the digit budget. Timestamps use a fixed-width
//! ISO-8601 form with millisecond precision and an explicit offset.

use chrono::DateTime;

use crate::error::{CodecError, CodecResult};
use crate::scalar::{ScalarType, ScalarValue};

/// Default number of integer digits for numeric values.
pub const DEFAULT_NUMBER_DIGITS: usize = 10;

/// `yyyy-MM-ddTHH:mm:ss.SSS±HH:mm`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

const TIMESTAMP_WIDTH: usize = 29;

/// Largest digit budget whose magnitudes still fit in an `i128` parse.
const MAX_NUMBER_DIGITS: usize = 38;

/// Encodes and decodes [`ScalarValue`]s to their store representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalarCodec {
    digits: usize,
}

impl Default for ScalarCodec {
    fn default() -> Self {
        Self::new(DEFAULT_NUMBER_DIGITS)
    }
}

impl ScalarCodec {
    /// Create a codec with the given integer digit budget (clamped to `1..=38`).
    pub fn new(digits: usize) -> Self {
        Self {
            digits: digits.clamp(1, MAX_NUMBER_DIGITS),
        }
    }

    /// The integer digit budget for numeric values.
    pub fn digits(&self) -> usize {
        self.digits
    }

    /// Encode a value into its store representation.
    pub fn encode(&self, value: &ScalarValue) -> CodecResult<String> {
        match value {
            ScalarValue::Text(s) => Ok(s.clone()),
            ScalarValue::Boolean(b) => Ok(b.to_string()),
            ScalarValue::Int32(v) => self.encode_integer(ScalarType::Int32, i64::from(*v)),
            ScalarValue::Int64(v) => self.encode_integer(ScalarType::Int64, *v),
            ScalarValue::Float32(v) => self.encode_float(*v),
            ScalarValue::Timestamp(ts) => Ok(ts.format(TIMESTAMP_FORMAT).to_string()),
        }
    }

    /// Decode a store representation into a value of type `ty`.
    pub fn decode(&self, ty: ScalarType, raw: &str) -> CodecResult<ScalarValue> {
        match ty {
            ScalarType::Text => Ok(ScalarValue::Text(raw.to_string())),
            ScalarType::Boolean => match raw {
                "true" => Ok(ScalarValue::Boolean(true)),
                "false" => Ok(ScalarValue::Boolean(false)),
                _ => Err(CodecError::malformed(ty, raw, "expected 'true' or 'false'")),
            },
            ScalarType::Int32 => {
                let v = self.decode_integer(ty, raw)?;
                i32::try_from(v)
                    .map(ScalarValue::Int32)
                    .map_err(|_| CodecError::malformed(ty, raw, "out of range for int32"))
            }
            ScalarType::Int64 => {
                let v = self.decode_integer(ty, raw)?;
                i64::try_from(v)
                    .map(ScalarValue::Int64)
                    .map_err(|_| CodecError::malformed(ty, raw, "out of range for int64"))
            }
            ScalarType::Float32 => self.decode_float(raw).map(ScalarValue::Float32),
            ScalarType::Timestamp => {
                if raw.len() != TIMESTAMP_WIDTH {
                    return Err(CodecError::malformed(
                        ty,
                        raw,
                        format!("expected {TIMESTAMP_WIDTH} characters"),
                    ));
                }
                DateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
                    .map(ScalarValue::Timestamp)
                    .map_err(|e| CodecError::malformed(ty, raw, e.to_string()))
            }
        }
    }

    /// Encode a record key. Only key-capable types are accepted.
    pub fn encode_key(&self, value: &ScalarValue) -> CodecResult<String> {
        let ty = value.scalar_type();
        if !ty.is_key_type() {
            return Err(CodecError::UnsupportedKeyType(ty));
        }
        self.encode(value)
    }

    /// Decode a record key of type `ty`.
    pub fn decode_key(&self, ty: ScalarType, raw: &str) -> CodecResult<ScalarValue> {
        if !ty.is_key_type() {
            return Err(CodecError::UnsupportedKeyType(ty));
        }
        self.decode(ty, raw)
    }

    fn encode_integer(&self, ty: ScalarType, value: i64) -> CodecResult<String> {
        let magnitude = value.unsigned_abs().to_string();
        if magnitude.len() > self.digits {
            return Err(CodecError::malformed(
                ty,
                value.to_string(),
                format!("exceeds the {}-digit budget", self.digits),
            ));
        }
        let padded = format!("{magnitude:0>width$}", width = self.digits);
        if value < 0 {
            Ok(format!("-{}", tens_complement(&padded)))
        } else {
            Ok(padded)
        }
    }

    fn decode_integer(&self, ty: ScalarType, raw: &str) -> CodecResult<i128> {
        let (negative, digits) = split_sign(raw);
        if digits.len() != self.digits {
            return Err(CodecError::malformed(
                ty,
                raw,
                format!("expected {} digits", self.digits),
            ));
        }
        if !is_digits(digits) {
            return Err(CodecError::malformed(ty, raw, "contains a non-digit"));
        }
        let magnitude = if negative {
            if is_all_zero(digits) {
                return Err(CodecError::malformed(ty, raw, "negative zero"));
            }
            tens_complement(digits)
        } else {
            digits.to_string()
        };
        let magnitude: i128 = magnitude
            .parse()
            .map_err(|_| CodecError::malformed(ty, raw, "unparseable magnitude"))?;
        Ok(if negative { -magnitude } else { magnitude })
    }

    fn encode_float(&self, value: f32) -> CodecResult<String> {
        let ty = ScalarType::Float32;
        if !value.is_finite() {
            return Err(CodecError::malformed(ty, value.to_string(), "not a finite number"));
        }
        // Collapses -0.0 onto 0.0.
        let value = if value == 0.0 { 0.0 } else { value };
        let rendered = value.abs().to_string();
        let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));
        if int_part.len() > self.digits {
            return Err(CodecError::malformed(
                ty,
                value.to_string(),
                format!("exceeds the {}-digit budget", self.digits),
            ));
        }
        let padded = format!("{int_part:0>width$}", width = self.digits);
        if value >= 0.0 {
            return Ok(join_decimal(&padded, frac_part));
        }
        let complement = tens_complement(&format!("{padded}{frac_part}"));
        let (int_c, frac_c) = complement.split_at(self.digits);
        Ok(format!("-{}", join_decimal(int_c, frac_c)))
    }

    fn decode_float(&self, raw: &str) -> CodecResult<f32> {
        let ty = ScalarType::Float32;
        let (negative, body) = split_sign(raw);
        let (int_part, frac_part) = match body.split_once('.') {
            Some((_, "")) => {
                return Err(CodecError::malformed(ty, raw, "empty fraction"));
            }
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.len() != self.digits {
            return Err(CodecError::malformed(
                ty,
                raw,
                format!("decimal point must follow {} integer digits", self.digits),
            ));
        }
        if !is_digits(int_part) || !is_digits(frac_part) {
            return Err(CodecError::malformed(ty, raw, "contains a non-digit"));
        }

        let (int_part, frac_part) = if negative {
            let combined = format!("{int_part}{frac_part}");
            if is_all_zero(&combined) {
                return Err(CodecError::malformed(ty, raw, "negative zero"));
            }
            let complement = tens_complement(&combined);
            let (i, f) = complement.split_at(self.digits);
            (i.to_string(), f.to_string())
        } else {
            (int_part.to_string(), frac_part.to_string())
        };

        let trimmed = int_part.trim_start_matches('0');
        let int_text = if trimmed.is_empty() { "0" } else { trimmed };
        let sign = if negative { "-" } else { "" };
        let text = format!("{sign}{}", join_decimal(int_text, &frac_part));
        text.parse::<f32>()
            .map_err(|e| CodecError::malformed(ty, raw, e.to_string()))
    }
}

fn split_sign(raw: &str) -> (bool, &str) {
    match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    }
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn is_all_zero(s: &str) -> bool {
    s.bytes().all(|b| b == b'0')
}

fn join_decimal(int_part: &str, frac_part: &str) -> String {
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// `10^n - x` for an `n`-digit, non-zero decimal string `x`.
///
/// The result has exactly `n` digits and the transform is its own inverse.
fn tens_complement(digits: &str) -> String {
    let mut out: Vec<u8> = digits.bytes().map(|b| b'9' - (b - b'0')).collect();
    for d in out.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            break;
        }
    }
    // Only ASCII digits were written above.
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};
    use proptest::prelude::*;

    fn codec() -> ScalarCodec {
        ScalarCodec::default()
    }

    // -----------------------------------------------------------------------
    // Fixed examples
    // -----------------------------------------------------------------------

    #[test]
    fn integers_are_zero_padded() {
        let c = codec();
        assert_eq!(c.encode(&ScalarValue::Int32(5)).unwrap(), "0000000005");
        assert_eq!(c.encode(&ScalarValue::Int64(0)).unwrap(), "0000000000");
        assert_eq!(
            c.encode(&ScalarValue::Int32(i32::MAX)).unwrap(),
            "2147483647"
        );
    }

    #[test]
    fn negative_integers_use_complement() {
        let c = codec();
        assert_eq!(c.encode(&ScalarValue::Int32(-1)).unwrap(), "-9999999999");
        assert_eq!(c.encode(&ScalarValue::Int32(-2)).unwrap(), "-9999999998");
        assert_eq!(
            c.decode(ScalarType::Int32, "-9999999998").unwrap(),
            ScalarValue::Int32(-2)
        );
        assert_eq!(
            c.decode(ScalarType::Int32, &c.encode(&ScalarValue::Int32(i32::MIN)).unwrap())
                .unwrap(),
            ScalarValue::Int32(i32::MIN)
        );
    }

    #[test]
    fn integer_beyond_budget_is_rejected() {
        let err = codec().encode(&ScalarValue::Int64(12_345_678_901)).unwrap_err();
        assert!(matches!(err, CodecError::MalformedValue { ty: ScalarType::Int64, .. }));

        let wide = ScalarCodec::new(19);
        let encoded = wide.encode(&ScalarValue::Int64(i64::MAX)).unwrap();
        assert_eq!(
            wide.decode(ScalarType::Int64, &encoded).unwrap(),
            ScalarValue::Int64(i64::MAX)
        );
    }

    #[test]
    fn floats_pad_the_integer_part() {
        let c = codec();
        assert_eq!(c.encode(&ScalarValue::Float32(3.5)).unwrap(), "0000000003.5");
        assert_eq!(c.encode(&ScalarValue::Float32(3.0)).unwrap(), "0000000003");
        assert_eq!(c.encode(&ScalarValue::Float32(-0.0)).unwrap(), "0000000000");
        assert_eq!(c.encode(&ScalarValue::Float32(-0.5)).unwrap(), "-9999999999.5");
        assert_eq!(
            c.decode(ScalarType::Float32, "-9999999996.75").unwrap(),
            ScalarValue::Float32(-3.25)
        );
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        assert!(codec().encode(&ScalarValue::Float32(f32::NAN)).is_err());
        assert!(codec().encode(&ScalarValue::Float32(f32::INFINITY)).is_err());
    }

    #[test]
    fn malformed_numbers_fail() {
        let c = codec();
        for raw in ["5", "00000000005", "00000x0005", "-0000000000", ""] {
            assert!(
                matches!(
                    c.decode(ScalarType::Int32, raw),
                    Err(CodecError::MalformedValue { .. })
                ),
                "{raw:?} should be malformed"
            );
        }
        for raw in ["3.5", "000000003.5", "0000000003.", "0000000003.5x"] {
            assert!(
                c.decode(ScalarType::Float32, raw).is_err(),
                "{raw:?} should be malformed"
            );
        }
    }

    #[test]
    fn booleans() {
        let c = codec();
        assert_eq!(c.encode(&ScalarValue::Boolean(true)).unwrap(), "true");
        assert_eq!(
            c.decode(ScalarType::Boolean, "false").unwrap(),
            ScalarValue::Boolean(false)
        );
        assert!(c.decode(ScalarType::Boolean, "TRUE").is_err());
    }

    #[test]
    fn timestamps_are_fixed_width() {
        let c = codec();
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let ts = offset.with_ymd_and_hms(2012, 5, 1, 10, 0, 0).unwrap();
        let encoded = c.encode(&ScalarValue::Timestamp(ts)).unwrap();
        assert_eq!(encoded, "2012-05-01T10:00:00.000+09:00");
        assert_eq!(
            c.decode(ScalarType::Timestamp, &encoded).unwrap(),
            ScalarValue::Timestamp(ts)
        );
        assert!(c.decode(ScalarType::Timestamp, "2012-05-01T10:00:00+09:00").is_err());
    }

    #[test]
    fn text_is_identity() {
        let c = codec();
        assert_eq!(c.encode(&ScalarValue::from("it's")).unwrap(), "it's");
        assert_eq!(
            c.decode(ScalarType::Text, "0001").unwrap(),
            ScalarValue::from("0001")
        );
    }

    #[test]
    fn key_types_are_restricted() {
        let c = codec();
        assert_eq!(
            c.encode_key(&ScalarValue::Boolean(true)),
            Err(CodecError::UnsupportedKeyType(ScalarType::Boolean))
        );
        assert_eq!(
            c.decode_key(ScalarType::Timestamp, "x"),
            Err(CodecError::UnsupportedKeyType(ScalarType::Timestamp))
        );
        assert_eq!(c.encode_key(&ScalarValue::Int64(42)).unwrap(), "0000000042");
    }

    #[test]
    fn complement_is_an_involution() {
        assert_eq!(tens_complement("0000000001"), "9999999999");
        assert_eq!(tens_complement("9999999999"), "0000000001");
        assert_eq!(tens_complement("0000000350"), "9999999650");
        assert_eq!(tens_complement(&tens_complement("0012340")), "0012340");
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    const BOUND: i64 = 9_999_999_999;

    proptest! {
        #[test]
        fn int32_round_trips(v in any::<i32>()) {
            let c = codec();
            let encoded = c.encode(&ScalarValue::Int32(v)).unwrap();
            prop_assert_eq!(c.decode(ScalarType::Int32, &encoded).unwrap(), ScalarValue::Int32(v));
        }

        #[test]
        fn int64_round_trips(v in -BOUND..=BOUND) {
            let c = codec();
            let encoded = c.encode(&ScalarValue::Int64(v)).unwrap();
            prop_assert_eq!(c.decode(ScalarType::Int64, &encoded).unwrap(), ScalarValue::Int64(v));
        }

        #[test]
        fn float32_round_trips(v in -1.0e9f32..1.0e9f32) {
            let c = codec();
            let encoded = c.encode(&ScalarValue::Float32(v)).unwrap();
            prop_assert_eq!(c.decode(ScalarType::Float32, &encoded).unwrap(), ScalarValue::Float32(v));
        }

        #[test]
        fn int64_order_is_preserved(a in -BOUND..=BOUND, b in -BOUND..=BOUND) {
            let c = codec();
            let ea = c.encode(&ScalarValue::Int64(a)).unwrap();
            let eb = c.encode(&ScalarValue::Int64(b)).unwrap();
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }

        #[test]
        fn float32_order_is_preserved(a in -1.0e9f32..1.0e9f32, b in -1.0e9f32..1.0e9f32) {
            prop_assume!(a != b);
            let c = codec();
            let ea = c.encode(&ScalarValue::Float32(a)).unwrap();
            let eb = c.encode(&ScalarValue::Float32(b)).unwrap();
            prop_assert_eq!(a < b, ea < eb);
        }

        #[test]
        fn timestamp_round_trips(ms in 0i64..253_370_764_800_000, offset_min in -720i32..=840) {
            let c = codec();
            let offset = FixedOffset::east_opt(offset_min * 60).unwrap();
            let ts = Utc.timestamp_millis_opt(ms).unwrap().with_timezone(&offset);
            let encoded = c.encode(&ScalarValue::Timestamp(ts)).unwrap();
            prop_assert_eq!(c.decode(ScalarType::Timestamp, &encoded).unwrap(), ScalarValue::Timestamp(ts));
        }
    }
}

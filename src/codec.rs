//! Conversion between indexed class-field terms and typed class values.
//!
//! Every place that turns bytes from the inverted index into a logical value,
//! or a logical value into index bytes, goes through this module. That
//! includes the generic-value wire form used when shard results travel back
//! to the coordinator.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::{Serialize, Serializer};

use crate::document::FieldValue;
use crate::error::{Result, SarissaError};
use crate::schema::FieldKind;
use crate::transport::stream::{StreamInput, StreamOutput};
use crate::util::numeric;

/// Indexed form of `true` in boolean fields.
pub const BOOLEAN_TRUE_TERM: &[u8] = b"T";

/// Indexed form of `false` in boolean fields.
pub const BOOLEAN_FALSE_TERM: &[u8] = b"F";

const TYPE_STRING: u8 = 0;
const TYPE_INT: u8 = 1;
const TYPE_LONG: u8 = 2;
const TYPE_FLOAT: u8 = 3;
const TYPE_DOUBLE: u8 = 4;
const TYPE_BOOLEAN: u8 = 5;

/// A logical class label.
///
/// Values are totally ordered: first by variant (text, bool, int, long,
/// float, double), then by value, with floats compared by their total order.
#[derive(Debug, Clone)]
pub enum ClassValue {
    Text(String),
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl ClassValue {
    fn rank(&self) -> u8 {
        match self {
            ClassValue::Text(_) => 0,
            ClassValue::Bool(_) => 1,
            ClassValue::Int(_) => 2,
            ClassValue::Long(_) => 3,
            ClassValue::Float(_) => 4,
            ClassValue::Double(_) => 5,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ClassValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ClassValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl PartialEq for ClassValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ClassValue {}

impl PartialOrd for ClassValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClassValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ClassValue::Text(a), ClassValue::Text(b)) => a.cmp(b),
            (ClassValue::Bool(a), ClassValue::Bool(b)) => a.cmp(b),
            (ClassValue::Int(a), ClassValue::Int(b)) => a.cmp(b),
            (ClassValue::Long(a), ClassValue::Long(b)) => a.cmp(b),
            (ClassValue::Float(a), ClassValue::Float(b)) => a.total_cmp(b),
            (ClassValue::Double(a), ClassValue::Double(b)) => a.total_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for ClassValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassValue::Text(s) => f.write_str(s),
            ClassValue::Bool(b) => write!(f, "{b}"),
            ClassValue::Int(i) => write!(f, "{i}"),
            ClassValue::Long(l) => write!(f, "{l}"),
            ClassValue::Float(v) => write!(f, "{v}"),
            ClassValue::Double(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for ClassValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ClassValue::Text(s) => serializer.serialize_str(s),
            ClassValue::Bool(b) => serializer.serialize_bool(*b),
            ClassValue::Int(i) => serializer.serialize_i32(*i),
            ClassValue::Long(l) => serializer.serialize_i64(*l),
            ClassValue::Float(v) => serializer.serialize_f32(*v),
            ClassValue::Double(v) => serializer.serialize_f64(*v),
        }
    }
}

impl From<&str> for ClassValue {
    fn from(value: &str) -> Self {
        ClassValue::Text(value.to_string())
    }
}

impl From<bool> for ClassValue {
    fn from(value: bool) -> Self {
        ClassValue::Bool(value)
    }
}

/// A class as produced by a classifier, before decoding.
///
/// Term-based classifiers hand back raw index terms; the perceptron produces
/// a logical boolean directly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClassKey {
    Term(Vec<u8>),
    Value(ClassValue),
}

impl ClassKey {
    /// Decode this key using the declared kind of the class field.
    pub fn decode(self, kind: FieldKind) -> Result<ClassValue> {
        match self {
            ClassKey::Term(bytes) => decode_term(kind, &bytes),
            ClassKey::Value(value) => Ok(value),
        }
    }
}

/// Decode an indexed term of a field of the given kind.
pub fn decode_term(kind: FieldKind, bytes: &[u8]) -> Result<ClassValue> {
    match kind {
        FieldKind::Float => {
            let sortable = numeric::prefix_coded_to_int(bytes)?;
            Ok(ClassValue::Float(numeric::sortable_int_to_float(sortable)))
        }
        FieldKind::Double => {
            let sortable = numeric::prefix_coded_to_long(bytes)?;
            Ok(ClassValue::Double(numeric::sortable_long_to_double(sortable)))
        }
        FieldKind::Short | FieldKind::Integer => {
            Ok(ClassValue::Int(numeric::prefix_coded_to_int(bytes)?))
        }
        FieldKind::Long | FieldKind::Date => {
            Ok(ClassValue::Long(numeric::prefix_coded_to_long(bytes)?))
        }
        FieldKind::Boolean => Ok(ClassValue::Bool(decode_boolean(bytes))),
        FieldKind::Text | FieldKind::Keyword => std::str::from_utf8(bytes)
            .map(|s| ClassValue::Text(s.to_string()))
            .map_err(|e| {
                SarissaError::schema_mismatch(format!("class term is not valid UTF-8: {e}"))
            }),
        FieldKind::Binary => Err(SarissaError::schema_mismatch(format!(
            "field type [{kind}] is not supported for class values"
        ))),
    }
}

/// Canonical boolean decode: empty or `"F"` is false, anything else true.
pub fn decode_boolean(bytes: &[u8]) -> bool {
    !(bytes.is_empty() || bytes == BOOLEAN_FALSE_TERM)
}

/// Encode a non-analyzed value into its single index term.
///
/// Text values are kept verbatim; analysis happens in the document mapper.
pub fn encode_value(kind: FieldKind, value: &FieldValue) -> Result<Vec<u8>> {
    match kind {
        FieldKind::Text | FieldKind::Keyword => Ok(value.as_text().into_bytes()),
        FieldKind::Boolean => encode_boolean(value),
        FieldKind::Short => {
            let v = integral(kind, value)?;
            let v = i16::try_from(v).map_err(|_| out_of_range(kind, value))?;
            Ok(numeric::int_to_prefix_coded(i32::from(v), 0))
        }
        FieldKind::Integer => {
            let v = integral(kind, value)?;
            let v = i32::try_from(v).map_err(|_| out_of_range(kind, value))?;
            Ok(numeric::int_to_prefix_coded(v, 0))
        }
        FieldKind::Long => Ok(numeric::long_to_prefix_coded(integral(kind, value)?, 0)),
        FieldKind::Date => Ok(numeric::long_to_prefix_coded(date_millis(value)?, 0)),
        FieldKind::Float => {
            let v = floating(kind, value)? as f32;
            Ok(numeric::int_to_prefix_coded(
                numeric::float_to_sortable_int(v),
                0,
            ))
        }
        FieldKind::Double => {
            let v = floating(kind, value)?;
            Ok(numeric::long_to_prefix_coded(
                numeric::double_to_sortable_long(v),
                0,
            ))
        }
        FieldKind::Binary => Err(SarissaError::schema_mismatch(format!(
            "field type [{kind}] cannot be indexed"
        ))),
    }
}

/// Encode a query-side string for a field, e.g. the value of a term query.
pub fn encode_text(kind: FieldKind, text: &str) -> Result<Vec<u8>> {
    encode_value(kind, &FieldValue::Text(text.to_string()))
}

fn encode_boolean(value: &FieldValue) -> Result<Vec<u8>> {
    let flag = match value {
        FieldValue::Boolean(b) => *b,
        FieldValue::Text(s) if s == "true" || s == "T" => true,
        FieldValue::Text(s) if s == "false" || s == "F" || s.is_empty() => false,
        other => {
            return Err(SarissaError::invalid_argument(format!(
                "failed to parse [{other}] as a boolean"
            )));
        }
    };
    Ok(if flag {
        BOOLEAN_TRUE_TERM.to_vec()
    } else {
        BOOLEAN_FALSE_TERM.to_vec()
    })
}

fn integral(kind: FieldKind, value: &FieldValue) -> Result<i64> {
    match value {
        FieldValue::Integer(i) => Ok(*i),
        FieldValue::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
        FieldValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| not_a_number(kind, value)),
        _ => Err(not_a_number(kind, value)),
    }
}

fn floating(kind: FieldKind, value: &FieldValue) -> Result<f64> {
    match value {
        FieldValue::Integer(i) => Ok(*i as f64),
        FieldValue::Float(f) => Ok(*f),
        FieldValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| not_a_number(kind, value)),
        FieldValue::Boolean(_) => Err(not_a_number(kind, value)),
    }
}

fn date_millis(value: &FieldValue) -> Result<i64> {
    match value {
        FieldValue::Integer(millis) => Ok(*millis),
        FieldValue::Text(s) => {
            if let Ok(millis) = s.parse::<i64>() {
                return Ok(millis);
            }
            if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
                return Ok(datetime.timestamp_millis());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|datetime| datetime.and_utc().timestamp_millis())
                .ok_or_else(|| {
                    SarissaError::invalid_argument(format!("failed to parse date [{s}]"))
                })
        }
        other => Err(SarissaError::invalid_argument(format!(
            "failed to parse date [{other}]"
        ))),
    }
}

fn not_a_number(kind: FieldKind, value: &FieldValue) -> SarissaError {
    SarissaError::invalid_argument(format!("failed to parse [{value}] as a {kind}"))
}

fn out_of_range(kind: FieldKind, value: &FieldValue) -> SarissaError {
    SarissaError::invalid_argument(format!("value [{value}] is out of range for a {kind}"))
}

/// Write a class value in the type-tagged generic form.
pub fn write_class_value(out: &mut StreamOutput, value: &ClassValue) {
    match value {
        ClassValue::Text(s) => {
            out.write_byte(TYPE_STRING);
            out.write_string(s);
        }
        ClassValue::Int(i) => {
            out.write_byte(TYPE_INT);
            out.write_i32(*i);
        }
        ClassValue::Long(l) => {
            out.write_byte(TYPE_LONG);
            out.write_i64(*l);
        }
        ClassValue::Float(f) => {
            out.write_byte(TYPE_FLOAT);
            out.write_f32(*f);
        }
        ClassValue::Double(d) => {
            out.write_byte(TYPE_DOUBLE);
            out.write_f64(*d);
        }
        ClassValue::Bool(b) => {
            out.write_byte(TYPE_BOOLEAN);
            out.write_bool(*b);
        }
    }
}

/// Read a class value written by [`write_class_value`].
pub fn read_class_value(input: &mut StreamInput<'_>) -> Result<ClassValue> {
    match input.read_byte()? {
        TYPE_STRING => Ok(ClassValue::Text(input.read_string()?)),
        TYPE_INT => Ok(ClassValue::Int(input.read_i32()?)),
        TYPE_LONG => Ok(ClassValue::Long(input.read_i64()?)),
        TYPE_FLOAT => Ok(ClassValue::Float(input.read_f32()?)),
        TYPE_DOUBLE => Ok(ClassValue::Double(input.read_f64()?)),
        TYPE_BOOLEAN => Ok(ClassValue::Bool(input.read_bool()?)),
        tag => Err(SarissaError::transport(format!(
            "can't read unknown generic value type [{tag}]"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_numeric_terms() {
        let term = encode_value(FieldKind::Integer, &FieldValue::Integer(-7)).unwrap();
        assert_eq!(
            decode_term(FieldKind::Integer, &term).unwrap(),
            ClassValue::Int(-7)
        );

        let term = encode_value(FieldKind::Short, &FieldValue::Text("12".into())).unwrap();
        assert_eq!(
            decode_term(FieldKind::Short, &term).unwrap(),
            ClassValue::Int(12)
        );

        let term = encode_value(FieldKind::Long, &FieldValue::Integer(1 << 40)).unwrap();
        assert_eq!(
            decode_term(FieldKind::Long, &term).unwrap(),
            ClassValue::Long(1 << 40)
        );

        let term = encode_value(FieldKind::Float, &FieldValue::Float(2.5)).unwrap();
        assert_eq!(
            decode_term(FieldKind::Float, &term).unwrap(),
            ClassValue::Float(2.5)
        );

        let term = encode_value(FieldKind::Double, &FieldValue::Float(-0.125)).unwrap();
        assert_eq!(
            decode_term(FieldKind::Double, &term).unwrap(),
            ClassValue::Double(-0.125)
        );
    }

    #[test]
    fn test_decode_date_as_long() {
        let term = encode_value(FieldKind::Date, &FieldValue::Text("1970-01-02".into())).unwrap();
        assert_eq!(
            decode_term(FieldKind::Date, &term).unwrap(),
            ClassValue::Long(86_400_000)
        );
    }

    #[test]
    fn test_decode_boolean() {
        assert_eq!(
            decode_term(FieldKind::Boolean, b"T").unwrap(),
            ClassValue::Bool(true)
        );
        assert_eq!(
            decode_term(FieldKind::Boolean, b"F").unwrap(),
            ClassValue::Bool(false)
        );
        assert_eq!(
            decode_term(FieldKind::Boolean, b"").unwrap(),
            ClassValue::Bool(false)
        );
        assert_eq!(
            encode_value(FieldKind::Boolean, &FieldValue::Text("true".into())).unwrap(),
            b"T".to_vec()
        );
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(
            decode_term(FieldKind::Keyword, "spam".as_bytes()).unwrap(),
            ClassValue::Text("spam".into())
        );
        assert!(decode_term(FieldKind::Text, &[0xFF, 0xFE]).is_err());
    }

    #[test]
    fn test_unsupported_kind() {
        let err = decode_term(FieldKind::Binary, b"abc").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SchemaMismatch);
    }

    #[test]
    fn test_numeric_term_for_wrong_kind() {
        let err = decode_term(FieldKind::Integer, &[0x10, 0x01]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SchemaMismatch);
    }

    #[test]
    fn test_out_of_range_short() {
        assert!(encode_value(FieldKind::Short, &FieldValue::Integer(70_000)).is_err());
        assert!(encode_value(FieldKind::Integer, &FieldValue::Text("x".into())).is_err());
    }

    #[test]
    fn test_class_value_order() {
        let mut values = vec![
            ClassValue::Double(1.0),
            ClassValue::Text("b".into()),
            ClassValue::Int(3),
            ClassValue::Text("a".into()),
            ClassValue::Bool(false),
            ClassValue::Int(-1),
        ];
        values.sort();

        assert_eq!(
            values,
            vec![
                ClassValue::Text("a".into()),
                ClassValue::Text("b".into()),
                ClassValue::Bool(false),
                ClassValue::Int(-1),
                ClassValue::Int(3),
                ClassValue::Double(1.0),
            ]
        );
    }

    #[test]
    fn test_generic_value_wire_form() {
        let values = [
            ClassValue::Text("spam".into()),
            ClassValue::Int(4),
            ClassValue::Long(-9),
            ClassValue::Float(0.5),
            ClassValue::Double(0.25),
            ClassValue::Bool(true),
        ];

        let mut out = StreamOutput::new();
        for value in &values {
            write_class_value(&mut out, value);
        }
        let bytes = out.into_bytes();
        assert_eq!(bytes[0], TYPE_STRING);

        let mut input = StreamInput::new(&bytes);
        for value in &values {
            assert_eq!(&read_class_value(&mut input).unwrap(), value);
        }
    }

    #[test]
    fn test_unknown_generic_tag() {
        let bytes = [42u8];
        let mut input = StreamInput::new(&bytes);
        assert!(read_class_value(&mut input).is_err());
    }

    #[test]
    fn test_render_json() {
        assert_eq!(
            serde_json::to_string(&ClassValue::Text("a".into())).unwrap(),
            "\"a\""
        );
        assert_eq!(serde_json::to_string(&ClassValue::Bool(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&ClassValue::Int(3)).unwrap(), "3");
    }
}

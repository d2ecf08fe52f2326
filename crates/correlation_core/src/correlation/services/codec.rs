//! Metadata codec.
//!
//! Converts application values into [`DynamicValue`]s for transport, and
//! [`DynamicValue`]s back into display-friendly views for structured logging.
//!
//! ## Encoding
//!
//! Types with a direct structural mapping (scalars, sequences, string-keyed maps,
//! JSON values) implement [`ToDynamicValue`] infallibly. Any other serializable
//! shape, typically a record, goes through the fallback by wrapping it in
//! [`Serialized`]: the value is serialized to JSON text, parsed back into a
//! generic JSON value and converted from there, so a record becomes a map keyed
//! by its serialized field names. Only a value serde itself refuses to serialize
//! makes encoding fail.
//!
//! ## Decoding
//!
//! [`MetadataCodec::decode`] classifies a value into a sequence, a mapping or a
//! scalar. It is total and used for logging only.
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    hash::BuildHasher,
};

use serde::Serialize;

use crate::correlation::{error::CorrelationError, infrastructure::value::DynamicValue};

/// Conversion of an application value into a [`DynamicValue`].
pub trait ToDynamicValue {
    /// Converts `self`. Only the serialization fallback can fail.
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error>;
}

impl<T: ToDynamicValue + ?Sized> ToDynamicValue for &T {
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        (**self).to_dynamic_value()
    }
}

impl ToDynamicValue for () {
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        Ok(DynamicValue::Null)
    }
}

impl ToDynamicValue for bool {
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        Ok(DynamicValue::Bool(*self))
    }
}

macro_rules! impl_to_dynamic_number {
    ($($ty:ty),*) => {
        $(
            impl ToDynamicValue for $ty {
                fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
                    // Integers beyond 2^53 lose precision, as in google.protobuf.Value
                    Ok(DynamicValue::Number(*self as f64))
                }
            }
        )*
    };
}

impl_to_dynamic_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl ToDynamicValue for str {
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        Ok(DynamicValue::String(self.to_owned()))
    }
}

impl ToDynamicValue for String {
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        self.as_str().to_dynamic_value()
    }
}

impl<T: ToDynamicValue> ToDynamicValue for Option<T> {
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        match self {
            Some(value) => value.to_dynamic_value(),
            None => Ok(DynamicValue::Null),
        }
    }
}

impl<T: ToDynamicValue> ToDynamicValue for [T] {
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        self.iter()
            .map(ToDynamicValue::to_dynamic_value)
            .collect::<Result<Vec<_>, serde_json::Error>>()
            .map(DynamicValue::List)
    }
}

impl<T: ToDynamicValue> ToDynamicValue for Vec<T> {
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        self.as_slice().to_dynamic_value()
    }
}

impl<K, V, S> ToDynamicValue for HashMap<K, V, S>
where
    K: AsRef<str>,
    V: ToDynamicValue,
    S: BuildHasher,
{
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        map_to_dynamic_value(self.iter())
    }
}

impl<K, V> ToDynamicValue for BTreeMap<K, V>
where
    K: AsRef<str>,
    V: ToDynamicValue,
{
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        map_to_dynamic_value(self.iter())
    }
}

fn map_to_dynamic_value<'a, K, V>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
) -> Result<DynamicValue, serde_json::Error>
where
    K: AsRef<str> + 'a,
    V: ToDynamicValue + 'a,
{
    entries
        .map(|(key, value)| Ok((key.as_ref().to_owned(), value.to_dynamic_value()?)))
        .collect::<Result<BTreeMap<_, _>, serde_json::Error>>()
        .map(DynamicValue::Map)
}

impl ToDynamicValue for serde_json::Value {
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        Ok(self.clone().into())
    }
}

impl ToDynamicValue for DynamicValue {
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        Ok(self.clone())
    }
}

/// Routes a serializable value through the JSON round-trip fallback.
///
/// ```
/// use correlation_core::correlation::services::codec::{MetadataCodec, Serialized};
///
/// #[derive(serde::Serialize)]
/// struct Sampling {
///     rate: u32,
/// }
///
/// let value = MetadataCodec::encode("sampling", &Serialized(Sampling { rate: 100 })).unwrap();
/// assert!(value.as_map().is_some());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Serialized<T>(pub T);

impl<T: Serialize> ToDynamicValue for Serialized<T> {
    fn to_dynamic_value(&self) -> Result<DynamicValue, serde_json::Error> {
        let text = serde_json::to_string(&self.0)?;
        let generic: serde_json::Value = serde_json::from_str(&text)?;
        Ok(generic.into())
    }
}

/// Display-friendly classification of a decoded metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataView {
    Sequence(Vec<serde_json::Value>),
    Mapping(serde_json::Map<String, serde_json::Value>),
    Scalar(serde_json::Value),
}

impl MetadataView {
    pub fn kind(&self) -> &'static str {
        match self {
            MetadataView::Sequence(_) => "sequence",
            MetadataView::Mapping(_) => "mapping",
            MetadataView::Scalar(_) => "scalar",
        }
    }
}

impl fmt::Display for MetadataView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataView::Sequence(items) => {
                write!(f, "{}", serde_json::Value::Array(items.to_owned()))
            }
            MetadataView::Mapping(fields) => {
                write!(f, "{}", serde_json::Value::Object(fields.to_owned()))
            }
            MetadataView::Scalar(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataCodec;

impl MetadataCodec {
    /// Encodes the value attached to metadata `key`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedValue` when the serialization fallback cannot serialize
    /// the value. Direct conversions never fail.
    pub fn encode<V: ToDynamicValue + ?Sized>(
        key: &str,
        value: &V,
    ) -> Result<DynamicValue, CorrelationError> {
        value.to_dynamic_value().map_err(|e| CorrelationError::UnsupportedValue {
            key: key.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Encodes `value` and stores it under `key`, leaving `metadata` untouched on failure.
    pub fn encode_into<V: ToDynamicValue + ?Sized>(
        metadata: &mut HashMap<String, DynamicValue>,
        key: &str,
        value: &V,
    ) -> Result<(), CorrelationError> {
        metadata.insert(key.to_owned(), Self::encode(key, value)?);
        Ok(())
    }

    /// Classifies `value` for display.
    pub fn decode(value: &DynamicValue) -> MetadataView {
        match render(value) {
            serde_json::Value::Array(items) => MetadataView::Sequence(items),
            serde_json::Value::Object(fields) => MetadataView::Mapping(fields),
            scalar => MetadataView::Scalar(scalar),
        }
    }
}

fn render(value: &DynamicValue) -> serde_json::Value {
    match value {
        DynamicValue::Null => serde_json::Value::Null,
        DynamicValue::Bool(b) => serde_json::Value::Bool(*b),
        // JSON has no NaN nor infinities, those are shown as text
        DynamicValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(n.to_string())),
        DynamicValue::String(s) => serde_json::Value::String(s.to_owned()),
        DynamicValue::List(items) => serde_json::Value::Array(items.iter().map(render).collect()),
        DynamicValue::Map(fields) => serde_json::Value::Object(
            fields.iter().map(|(key, value)| (key.to_owned(), render(value))).collect(),
        ),
    }
}

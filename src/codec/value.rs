use crate::{Error, Result, codec};

use aws_sdk_dynamodb::primitives::Blob;
use indexmap::{IndexMap, IndexSet};
use std::{collections, fmt, hash, io};
use time::OffsetDateTime;

/// Static element kind of a collection.
///
/// Collections remember the kind of their elements so that an empty or
/// all-absent collection can still be encoded as the right set type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    /// Booleans.
    Bool,
    /// Integers and decimals.
    Number,
    /// Strings and characters.
    String,
    /// Date-time values.
    DateTime,
    /// Binary blobs.
    Binary,
    /// Nested lists or sets.
    Collection,
    /// String-keyed maps.
    Map,
    /// Nested records.
    Record,
    /// Elements whose kind is only known at runtime.
    Dynamic,
}

/// Number stored in its decimal text form.
///
/// ```rust
/// use dynamodb_transact::codec::value::Number;
///
/// let number = Number::from(42);
/// assert_eq!(number.as_str(), "42");
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Number(String);

impl Number {
    /// Parse a decimal string, rejecting anything that is not a finite number.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let number = Self(value.into());
        number.checked()?;
        Ok(number)
    }

    /// The decimal text of the number.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn checked(&self) -> Result<&str> {
        let is_decimal = !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
        match self.0.parse::<f64>() {
            Ok(parsed) if is_decimal && parsed.is_finite() => Ok(&self.0),
            _ => Err(Error::UnsupportedType(format!("non-finite number `{}`", self.0))),
        }
    }

    /// The number as a non-negative integer, if it is one.
    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! impl_number_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Number {
                fn from(value: $ty) -> Self {
                    Self(value.to_string())
                }
            }

            impl ToValue for $ty {
                const KIND: Kind = Kind::Number;

                fn to_value(&self) -> Value {
                    Value::Number(Number::from(*self))
                }
            }
        )*
    };
}

impl_number_from!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

/// Ordered collection with a static element kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Collection {
    /// The declared kind of the elements.
    pub kind: Kind,
    /// The elements, in order.
    pub items: Vec<Value>,
}

/// A nested record: its metadata plus one value per declared field.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    metadata: &'static codec::metadata::RecordMetadata,
    values: Vec<Value>,
}

impl Document {
    /// Snapshot the fields of a record.
    pub fn of<R: codec::metadata::Record>(record: &R) -> Self {
        let metadata = R::metadata();
        let values = metadata
            .fields()
            .map(|field| record.field(&field.name).unwrap_or(Value::Null))
            .collect();
        Self { metadata, values }
    }

    /// The metadata of the record.
    pub fn metadata(&self) -> &'static codec::metadata::RecordMetadata {
        self.metadata
    }

    /// The declared fields paired with their values, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&codec::metadata::FieldMetadata, &Value)> {
        self.metadata.fields().zip(self.values.iter())
    }

    /// The value of a declared field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let index = self.metadata.field_index(name)?;
        self.values.get(index)
    }
}

/// Typed value accepted by the codec.
///
/// ```rust
/// use dynamodb_transact::codec::value::{ToValue, Value};
///
/// let value = vec![Some(1), None, Some(2)].to_value();
/// assert!(matches!(value, Value::List(_)));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer or decimal number.
    Number(Number),
    /// String.
    String(String),
    /// Date and time, encoded in UTC.
    DateTime(OffsetDateTime),
    /// Binary blob.
    Binary(Blob),
    /// Ordered collection.
    List(Collection),
    /// Set-typed collection.
    Set(Collection),
    /// String-keyed map.
    Map(IndexMap<String, Value>),
    /// Nested record.
    Record(Document),
}

impl Value {
    /// Snapshot a record as a nested value.
    pub fn record<R: codec::metadata::Record>(record: &R) -> Self {
        Self::Record(Document::of(record))
    }

    /// Read a binary source to its end.
    pub fn from_reader(mut reader: impl io::Read) -> Result<Self> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|err| Error::UnsupportedType(format!("unreadable binary source: {err}")))?;
        Ok(Self::Binary(Blob::new(bytes)))
    }

    /// Whether this is the absent value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Runtime kind of this value; `None` for the absent value.
    pub fn kind(&self) -> Option<Kind> {
        let kind = match self {
            Self::Null => return None,
            Self::Bool(_) => Kind::Bool,
            Self::Number(_) => Kind::Number,
            Self::String(_) => Kind::String,
            Self::DateTime(_) => Kind::DateTime,
            Self::Binary(_) => Kind::Binary,
            Self::List(_) | Self::Set(_) => Kind::Collection,
            Self::Map(_) => Kind::Map,
            Self::Record(_) => Kind::Record,
        };
        Some(kind)
    }
}

/// Conversion into a codec [`Value`].
pub trait ToValue {
    /// Static kind of the produced value, used for collection elements.
    const KIND: Kind;

    /// Convert into a value.
    fn to_value(&self) -> Value;
}

impl<T: ToValue + ?Sized> ToValue for &T {
    const KIND: Kind = T::KIND;

    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl ToValue for Value {
    const KIND: Kind = Kind::Dynamic;

    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for Number {
    const KIND: Kind = Kind::Number;

    fn to_value(&self) -> Value {
        Value::Number(self.clone())
    }
}

impl ToValue for bool {
    const KIND: Kind = Kind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for char {
    const KIND: Kind = Kind::String;

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for str {
    const KIND: Kind = Kind::String;

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for String {
    const KIND: Kind = Kind::String;

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToValue for OffsetDateTime {
    const KIND: Kind = Kind::DateTime;

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

impl ToValue for Blob {
    const KIND: Kind = Kind::Binary;

    fn to_value(&self) -> Value {
        Value::Binary(self.clone())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    const KIND: Kind = T::KIND;

    fn to_value(&self) -> Value {
        match self {
            Some(value) => value.to_value(),
            None => Value::Null,
        }
    }
}

fn list<'a, T: ToValue + 'a>(items: impl Iterator<Item = &'a T>) -> Value {
    Value::List(Collection {
        kind: T::KIND,
        items: items.map(ToValue::to_value).collect(),
    })
}

fn set<'a, T: ToValue + 'a>(items: impl Iterator<Item = &'a T>) -> Value {
    Value::Set(Collection {
        kind: T::KIND,
        items: items.map(ToValue::to_value).collect(),
    })
}

impl<T: ToValue> ToValue for [T] {
    const KIND: Kind = Kind::Collection;

    fn to_value(&self) -> Value {
        list(self.iter())
    }
}

impl<T: ToValue, const N: usize> ToValue for [T; N] {
    const KIND: Kind = Kind::Collection;

    fn to_value(&self) -> Value {
        list(self.iter())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    const KIND: Kind = Kind::Collection;

    fn to_value(&self) -> Value {
        list(self.iter())
    }
}

impl<T: ToValue, S> ToValue for collections::HashSet<T, S> {
    const KIND: Kind = Kind::Collection;

    fn to_value(&self) -> Value {
        set(self.iter())
    }
}

impl<T: ToValue> ToValue for collections::BTreeSet<T> {
    const KIND: Kind = Kind::Collection;

    fn to_value(&self) -> Value {
        set(self.iter())
    }
}

impl<T: ToValue, S> ToValue for IndexSet<T, S> {
    const KIND: Kind = Kind::Collection;

    fn to_value(&self) -> Value {
        set(self.iter())
    }
}

fn map<'a, K: fmt::Display + 'a, V: ToValue + 'a>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
) -> Value {
    Value::Map(
        entries
            .map(|(key, value)| (key.to_string(), value.to_value()))
            .collect(),
    )
}

impl<K: fmt::Display + Eq + hash::Hash, V: ToValue, S> ToValue for collections::HashMap<K, V, S> {
    const KIND: Kind = Kind::Map;

    fn to_value(&self) -> Value {
        map(self.iter())
    }
}

impl<K: fmt::Display + Ord, V: ToValue> ToValue for collections::BTreeMap<K, V> {
    const KIND: Kind = Kind::Map;

    fn to_value(&self) -> Value {
        map(self.iter())
    }
}

impl<K: fmt::Display + Eq + hash::Hash, V: ToValue, S> ToValue for IndexMap<K, V, S> {
    const KIND: Kind = Kind::Map;

    fn to_value(&self) -> Value {
        map(self.iter())
    }
}

#[cfg(feature = "json")]
impl ToValue for serde_json::Value {
    const KIND: Kind = Kind::Dynamic;

    fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(value) => Value::Bool(*value),
            Self::Number(value) => Value::Number(Number(value.to_string())),
            Self::String(value) => Value::String(value.clone()),
            Self::Array(items) => list(items.iter()),
            Self::Object(entries) => map(entries.iter()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::integer("42")]
    #[case::negative("-7")]
    #[case::decimal("10.5")]
    #[case::exponent("1e10")]
    fn test_number_accepts_decimals(#[case] text: &str) {
        let number = Number::new(text).unwrap();
        assert_eq!(number.as_str(), text);
    }

    #[rstest]
    #[case::nan("NaN")]
    #[case::infinity("inf")]
    #[case::empty("")]
    #[case::word("forty")]
    fn test_number_rejects_non_finite(#[case] text: &str) {
        assert!(matches!(Number::new(text), Err(Error::UnsupportedType(_))));
    }

    #[test]
    fn test_float_keeps_shortest_decimal_form() {
        assert_eq!(1.1f64.to_value(), Value::Number(Number("1.1".to_string())));
    }

    #[test]
    fn test_nullable_list_keeps_absent_elements() {
        let value = vec![Some(1), None, Some(2)].to_value();
        assert_eq!(
            value,
            Value::List(Collection {
                kind: Kind::Number,
                items: vec![
                    Value::Number(Number::from(1)),
                    Value::Null,
                    Value::Number(Number::from(2)),
                ],
            })
        );
    }

    #[test]
    fn test_hash_set_is_set_typed() {
        let value = collections::HashSet::from(["a".to_string()]).to_value();
        assert_eq!(
            value,
            Value::Set(Collection {
                kind: Kind::String,
                items: vec![Value::String("a".to_string())],
            })
        );
    }

    #[test]
    fn test_from_reader_reads_to_end() {
        let value = Value::from_reader(io::Cursor::new(vec![1u8, 2])).unwrap();
        assert_eq!(value, Value::Binary(Blob::new(vec![1u8, 2])));
    }

    #[test]
    fn test_from_reader_rejects_failing_source() {
        struct Closed;

        impl io::Read for Closed {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("stream closed"))
            }
        }

        assert!(matches!(
            Value::from_reader(Closed),
            Err(Error::UnsupportedType(_))
        ));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_array_is_dynamic_list() {
        let value = serde_json::json!(["a", 1]).to_value();
        assert_eq!(
            value,
            Value::List(Collection {
                kind: Kind::Dynamic,
                items: vec![
                    Value::String("a".to_string()),
                    Value::Number(Number::from(1)),
                ],
            })
        );
    }
}

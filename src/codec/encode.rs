use crate::{
    Error, Result,
    codec::{
        EncodingPolicy,
        metadata::{FieldRole, Record},
        value::{Collection, Document, Kind, Value},
    },
};

use aws_sdk_dynamodb::{primitives::Blob, types::AttributeValue};
use indexmap::IndexSet;
use std::collections;
use time::{OffsetDateTime, UtcOffset, macros::format_description};

/// Format a date-time as `yyyy-MM-ddTHH:mm:ss.fffZ` in UTC, truncating to milliseconds.
pub fn format_date_time(date_time: &OffsetDateTime) -> Result<String> {
    date_time
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .map_err(|err| Error::UnsupportedType(format!("date-time out of range: {err}")))
}

/// Encode a value under the given policy.
pub fn encode(value: &Value, policy: EncodingPolicy) -> Result<AttributeValue> {
    let attribute_value = match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(value) => match policy {
            EncodingPolicy::Legacy => AttributeValue::N(legacy_bool(*value)),
            EncodingPolicy::Current => AttributeValue::Bool(*value),
        },
        Value::Number(number) => AttributeValue::N(number.checked()?.to_string()),
        Value::String(value) => AttributeValue::S(value.clone()),
        Value::DateTime(date_time) => AttributeValue::S(format_date_time(date_time)?),
        Value::Binary(blob) => AttributeValue::B(blob.clone()),
        Value::List(collection) => match policy {
            EncodingPolicy::Legacy => encode_legacy_list(collection)?,
            EncodingPolicy::Current => encode_list(collection, policy)?,
        },
        Value::Set(collection) => encode_set(collection, policy)?,
        Value::Map(entries) => {
            let mut map = collections::HashMap::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key.clone(), encode(value, policy)?);
            }
            AttributeValue::M(map)
        }
        Value::Record(document) => {
            if document.metadata().is_value_type() {
                return Err(Error::UnsupportedType(format!(
                    "value-typed record `{}` cannot be nested",
                    document.metadata().table_name()
                )));
            }
            AttributeValue::M(encode_document(document, policy)?)
        }
    };
    Ok(attribute_value)
}

/// Encode a record into a full item.
pub fn encode_record<R: Record>(
    record: &R,
    policy: EncodingPolicy,
) -> Result<collections::HashMap<String, AttributeValue>> {
    encode_document(&Document::of(record), policy)
}

/// Encode the declared fields of a document.
///
/// Absent fields are left out, except the version field which is written as
/// `NULL` so that a put can replace it.
pub fn encode_document(
    document: &Document,
    policy: EncodingPolicy,
) -> Result<collections::HashMap<String, AttributeValue>> {
    let mut item = collections::HashMap::new();
    for (field, value) in document.fields() {
        if field.role == FieldRole::Version {
            item.insert(field.attribute_name.clone(), encode_version(value)?);
        } else if !value.is_null() {
            item.insert(field.attribute_name.clone(), encode(value, policy)?);
        }
    }
    Ok(item)
}

/// Encode a version counter: absent, or a non-negative integer.
pub fn encode_version(value: &Value) -> Result<AttributeValue> {
    match value {
        Value::Null => Ok(AttributeValue::Null(true)),
        Value::Number(number) => match number.as_u64() {
            Some(version) => Ok(AttributeValue::N(version.to_string())),
            None => Err(Error::InvalidVersion(number.to_string())),
        },
        other => Err(Error::InvalidVersion(format!("{other:?}"))),
    }
}

fn legacy_bool(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn encode_list(collection: &Collection, policy: EncodingPolicy) -> Result<AttributeValue> {
    let mut items = Vec::with_capacity(collection.items.len());
    for item in &collection.items {
        items.push(encode(item, policy)?);
    }
    Ok(AttributeValue::L(items))
}

fn encode_legacy_list(collection: &Collection) -> Result<AttributeValue> {
    if matches!(collection.kind, Kind::Collection | Kind::Map | Kind::Record) {
        return Err(unsupported_element(collection.kind));
    }
    if collection.items.iter().any(Value::is_null) {
        // sets have no slot for an absent member: keep each element in a list
        return encode_list(collection, EncodingPolicy::Legacy);
    }
    if collection.items.is_empty()
        && SetType::of_kind(collection.kind, EncodingPolicy::Legacy).is_none()
    {
        return Ok(AttributeValue::L(Vec::new()));
    }
    encode_set(collection, EncodingPolicy::Legacy)
}

/// Wire set variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SetType {
    Number,
    String,
    Binary,
}

impl SetType {
    fn of_kind(kind: Kind, policy: EncodingPolicy) -> Option<Self> {
        match kind {
            Kind::Number => Some(Self::Number),
            Kind::Bool if policy == EncodingPolicy::Legacy => Some(Self::Number),
            Kind::String | Kind::DateTime => Some(Self::String),
            Kind::Binary => Some(Self::Binary),
            _ => None,
        }
    }
}

enum Member<'a> {
    Number(String),
    String(String),
    Binary(&'a Blob),
}

impl Member<'_> {
    fn set_type(&self) -> SetType {
        match self {
            Self::Number(_) => SetType::Number,
            Self::String(_) => SetType::String,
            Self::Binary(_) => SetType::Binary,
        }
    }
}

fn member(value: &Value, policy: EncodingPolicy) -> Result<Member<'_>> {
    let member = match value {
        Value::Number(number) => Member::Number(number.checked()?.to_string()),
        Value::Bool(value) if policy == EncodingPolicy::Legacy => {
            Member::Number(legacy_bool(*value))
        }
        Value::String(value) => Member::String(value.clone()),
        Value::DateTime(date_time) => Member::String(format_date_time(date_time)?),
        Value::Binary(blob) => Member::Binary(blob),
        Value::Null => {
            return Err(Error::UnsupportedType(
                "sets cannot hold absent members".to_string(),
            ));
        }
        other => {
            let kind = other.kind().unwrap_or(Kind::Dynamic);
            return Err(unsupported_element(kind));
        }
    };
    Ok(member)
}

fn unsupported_element(kind: Kind) -> Error {
    Error::UnsupportedType(format!(
        "collections of {kind:?} elements cannot be encoded as a set"
    ))
}

fn encode_set(collection: &Collection, policy: EncodingPolicy) -> Result<AttributeValue> {
    let mut members = Vec::with_capacity(collection.items.len());
    for item in &collection.items {
        members.push(member(item, policy)?);
    }
    let set_type = match members.first() {
        Some(first) => first.set_type(),
        None => SetType::of_kind(collection.kind, policy).ok_or_else(|| {
            Error::UnsupportedType(format!(
                "cannot infer the set type of an empty {:?} collection",
                collection.kind
            ))
        })?,
    };
    if let Some(mixed) = members.iter().find(|member| member.set_type() != set_type) {
        return Err(Error::UnsupportedType(format!(
            "set mixes {:?} and {:?} members",
            set_type,
            mixed.set_type()
        )));
    }
    let attribute_value = match set_type {
        SetType::Number | SetType::String => {
            let unique: IndexSet<String> = members
                .into_iter()
                .filter_map(|member| match member {
                    Member::Number(text) | Member::String(text) => Some(text),
                    Member::Binary(_) => None,
                })
                .collect();
            let unique = unique.into_iter().collect();
            if set_type == SetType::Number {
                AttributeValue::Ns(unique)
            } else {
                AttributeValue::Ss(unique)
            }
        }
        SetType::Binary => {
            let unique: IndexSet<&[u8]> = members
                .iter()
                .filter_map(|member| match member {
                    Member::Binary(blob) => Some(blob.as_ref()),
                    _ => None,
                })
                .collect();
            AttributeValue::Bs(
                unique
                    .into_iter()
                    .map(|bytes| Blob::new(bytes.to_vec()))
                    .collect(),
            )
        }
    };
    Ok(attribute_value)
}

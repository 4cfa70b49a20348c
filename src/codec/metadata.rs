use crate::{Error, Result, codec::value::Value};

use indexmap::IndexMap;

/// Role a field plays in its record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldRole {
    /// Plain attribute.
    Attribute,
    /// Partition (hash) key.
    HashKey,
    /// Sort (range) key.
    RangeKey,
    /// Optimistic-concurrency version counter.
    Version,
}

/// Declared field of a record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldMetadata {
    /// Logical field name.
    pub name: String,
    /// Attribute name on the wire.
    pub attribute_name: String,
    /// Role of the field.
    pub role: FieldRole,
}

/// Static description of a record type: its table, fields, key and version.
///
/// Built once per type and cached, typically in a `LazyLock`:
///
/// ```rust
/// use dynamodb_transact::codec::metadata::RecordMetadata;
/// use std::sync::LazyLock;
///
/// static USER: LazyLock<RecordMetadata> = LazyLock::new(|| {
///     RecordMetadata::builder("users")
///         .hash_key_as("id", "MyId")
///         .field("name")
///         .version("version")
///         .build()
/// });
///
/// assert_eq!(USER.attribute_name("id").unwrap(), "MyId");
/// assert_eq!(USER.hash_key_name().unwrap(), "MyId");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordMetadata {
    table_name: String,
    fields: IndexMap<String, FieldMetadata>,
    hash_key: Option<String>,
    range_key: Option<String>,
    version: Option<String>,
    value_type: bool,
}

impl RecordMetadata {
    /// Start describing a record stored in `table_name`.
    pub fn builder(table_name: impl Into<String>) -> RecordMetadataBuilder {
        RecordMetadataBuilder {
            metadata: Self {
                table_name: table_name.into(),
                fields: IndexMap::new(),
                hash_key: None,
                range_key: None,
                version: None,
                value_type: false,
            },
        }
    }

    /// The table the record is stored in.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.values()
    }

    pub(crate) fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }

    /// Look up a declared field.
    pub fn field(&self, name: &str) -> Result<&FieldMetadata> {
        self.fields.get(name).ok_or_else(|| Error::UnknownField {
            table: self.table_name.clone(),
            field: name.to_string(),
        })
    }

    /// Resolve a logical field name to its attribute name.
    pub fn attribute_name(&self, field: &str) -> Result<&str> {
        Ok(&self.field(field)?.attribute_name)
    }

    /// The hash key field.
    pub fn hash_key(&self) -> Result<&FieldMetadata> {
        self.hash_key
            .as_deref()
            .and_then(|name| self.fields.get(name))
            .ok_or_else(|| Error::MissingHashKey(self.table_name.clone()))
    }

    /// The attribute name of the hash key.
    pub fn hash_key_name(&self) -> Result<&str> {
        Ok(&self.hash_key()?.attribute_name)
    }

    /// The range key field, if declared.
    pub fn range_key(&self) -> Option<&FieldMetadata> {
        self.range_key
            .as_deref()
            .and_then(|name| self.fields.get(name))
    }

    /// The version field, if declared.
    pub fn version(&self) -> Option<&FieldMetadata> {
        self.version.as_deref().and_then(|name| self.fields.get(name))
    }

    /// Whether the record is a plain-data aggregate without identity.
    pub fn is_value_type(&self) -> bool {
        self.value_type
    }
}

/// Builder for [`RecordMetadata`].
#[derive(Clone, Debug)]
pub struct RecordMetadataBuilder {
    metadata: RecordMetadata,
}

impl RecordMetadataBuilder {
    fn declare(mut self, name: String, attribute_name: String, role: FieldRole) -> Self {
        // a designation moves: the previous holder of a unique role becomes a plain attribute
        let previous = match role {
            FieldRole::HashKey => self.metadata.hash_key.replace(name.clone()),
            FieldRole::RangeKey => self.metadata.range_key.replace(name.clone()),
            FieldRole::Version => self.metadata.version.replace(name.clone()),
            FieldRole::Attribute => None,
        };
        if let Some(field) = previous.and_then(|previous| self.metadata.fields.get_mut(&previous)) {
            field.role = FieldRole::Attribute;
        }
        let field = FieldMetadata {
            name: name.clone(),
            attribute_name,
            role,
        };
        self.metadata.fields.insert(name, field);
        self
    }

    /// Declare a plain attribute stored under its own name.
    pub fn field(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.declare(name.clone(), name, FieldRole::Attribute)
    }

    /// Declare a plain attribute stored under a different name.
    pub fn field_as(self, name: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        self.declare(name.into(), attribute_name.into(), FieldRole::Attribute)
    }

    /// Declare the hash key, stored under its own name.
    pub fn hash_key(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.declare(name.clone(), name, FieldRole::HashKey)
    }

    /// Declare the hash key, stored under a different name.
    pub fn hash_key_as(self, name: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        self.declare(name.into(), attribute_name.into(), FieldRole::HashKey)
    }

    /// Declare the range key, stored under its own name.
    pub fn range_key(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.declare(name.clone(), name, FieldRole::RangeKey)
    }

    /// Declare the range key, stored under a different name.
    pub fn range_key_as(self, name: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        self.declare(name.into(), attribute_name.into(), FieldRole::RangeKey)
    }

    /// Declare the version counter, stored under its own name.
    pub fn version(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.declare(name.clone(), name, FieldRole::Version)
    }

    /// Mark the record as a plain-data aggregate. Such records cannot be nested.
    pub fn value_type(mut self) -> Self {
        self.metadata.value_type = true;
        self
    }

    /// Finish the description.
    pub fn build(self) -> RecordMetadata {
        self.metadata
    }
}

/// A record type that can be written transactionally.
///
/// ```rust
/// use dynamodb_transact::codec::{
///     metadata::{Record, RecordMetadata},
///     value::{ToValue, Value},
/// };
/// use std::sync::LazyLock;
///
/// struct User {
///     id: String,
///     version: Option<u64>,
/// }
///
/// static USER: LazyLock<RecordMetadata> = LazyLock::new(|| {
///     RecordMetadata::builder("users")
///         .hash_key("id")
///         .version("version")
///         .build()
/// });
///
/// impl Record for User {
///     fn metadata() -> &'static RecordMetadata {
///         &USER
///     }
///
///     fn field(&self, name: &str) -> Option<Value> {
///         match name {
///             "id" => Some(self.id.to_value()),
///             "version" => Some(self.version.to_value()),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Record {
    /// The cached metadata of the type.
    fn metadata() -> &'static RecordMetadata;

    /// The current value of a declared field; `None` when the field is not declared.
    fn field(&self, name: &str) -> Option<Value>;
}

/// The version field name and its current value, when the record declares one.
pub fn resolve_version<R: Record>(record: &R) -> (Option<&'static str>, Option<Value>) {
    match R::metadata().version() {
        Some(field) => {
            let value = record.field(&field.name).filter(|value| !value.is_null());
            (Some(field.name.as_str()), value)
        }
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::value::{Number, ToValue};

    use rstest::rstest;
    use std::sync::LazyLock;

    struct Versioned {
        name: String,
        version: Option<u64>,
    }

    static VERSIONED: LazyLock<RecordMetadata> = LazyLock::new(|| {
        RecordMetadata::builder("versioned")
            .hash_key_as("name", "Name")
            .field_as("status", "State")
            .version("version")
            .build()
    });

    impl Record for Versioned {
        fn metadata() -> &'static RecordMetadata {
            &VERSIONED
        }

        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "name" => Some(self.name.to_value()),
                "status" => Some(Value::Null),
                "version" => Some(self.version.to_value()),
                _ => None,
            }
        }
    }

    struct Unversioned;

    static UNVERSIONED: LazyLock<RecordMetadata> =
        LazyLock::new(|| RecordMetadata::builder("unversioned").field("name").build());

    impl Record for Unversioned {
        fn metadata() -> &'static RecordMetadata {
            &UNVERSIONED
        }

        fn field(&self, _: &str) -> Option<Value> {
            None
        }
    }

    #[rstest]
    #[case::hash_key("name", "Name")]
    #[case::renamed("status", "State")]
    #[case::same_name("version", "version")]
    fn test_attribute_name(#[case] field: &str, #[case] expected: &str) {
        assert_eq!(VERSIONED.attribute_name(field).unwrap(), expected);
    }

    #[test]
    fn test_attribute_name_unknown_field() {
        let error = VERSIONED.attribute_name("missing").unwrap_err();
        assert!(matches!(error, Error::UnknownField { ref field, .. } if field == "missing"));
    }

    #[test]
    fn test_hash_key_name_missing() {
        assert!(matches!(
            UNVERSIONED.hash_key_name(),
            Err(Error::MissingHashKey(table)) if table == "unversioned"
        ));
    }

    #[test]
    fn test_redeclared_hash_key_demotes_previous() {
        let metadata = RecordMetadata::builder("t")
            .hash_key("a")
            .hash_key("b")
            .build();
        assert_eq!(metadata.hash_key_name().unwrap(), "b");
        assert_eq!(metadata.field("a").unwrap().role, FieldRole::Attribute);
    }

    #[rstest]
    #[case::absent(None, None)]
    #[case::present(Some(3), Some(Value::Number(Number::from(3u64))))]
    fn test_resolve_version(#[case] version: Option<u64>, #[case] expected: Option<Value>) {
        let record = Versioned {
            name: "a".to_string(),
            version,
        };
        assert_eq!(resolve_version(&record), (Some("version"), expected));
    }

    #[test]
    fn test_resolve_version_without_version_field() {
        assert_eq!(resolve_version(&Unversioned), (None, None));
    }
}

use crate::{Error, Result, codec::metadata::RecordMetadata};

use aws_sdk_dynamodb::types::AttributeValue;
use serde::de::DeserializeOwned;
use serde_dynamo::from_item;
use std::collections;

/// The hash key attribute of an item, looked up through the record metadata.
pub fn hash_key<'a>(
    metadata: &RecordMetadata,
    item: &'a collections::HashMap<String, AttributeValue>,
) -> Result<&'a AttributeValue> {
    let name = metadata.hash_key_name()?;
    item.get(name)
        .ok_or_else(|| Error::MissingValue(format!("hash key `{name}`")))
}

/// The version counter of an item: `None` when absent or `NULL`.
pub fn version(
    metadata: &RecordMetadata,
    item: &collections::HashMap<String, AttributeValue>,
) -> Result<Option<u64>> {
    let Some(field) = metadata.version() else {
        return Ok(None);
    };
    match item.get(&field.attribute_name) {
        None | Some(AttributeValue::Null(_)) => Ok(None),
        Some(AttributeValue::N(number)) => number
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidVersion(number.clone())),
        Some(other) => Err(Error::InvalidVersion(format!("{other:?}"))),
    }
}

/// Deserialize an item into a domain type.
pub fn record<T: DeserializeOwned>(
    item: collections::HashMap<String, AttributeValue>,
) -> Result<T> {
    let record = from_item(item)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{
        EncodingPolicy,
        encode::encode_record,
        metadata::Record,
        value::{ToValue, Value},
    };

    use rstest::rstest;
    use serde::Deserialize;
    use std::sync::LazyLock;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Account {
        #[serde(rename = "AccountId")]
        id: String,
        balance: f64,
        version: Option<u64>,
    }

    static ACCOUNT: LazyLock<RecordMetadata> = LazyLock::new(|| {
        RecordMetadata::builder("accounts")
            .hash_key_as("id", "AccountId")
            .field("balance")
            .version("version")
            .build()
    });

    impl Record for Account {
        fn metadata() -> &'static RecordMetadata {
            &ACCOUNT
        }

        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "id" => Some(self.id.to_value()),
                "balance" => Some(self.balance.to_value()),
                "version" => Some(self.version.to_value()),
                _ => None,
            }
        }
    }

    #[rstest]
    #[case::never_written(None)]
    #[case::first(Some(0))]
    #[case::later(Some(41))]
    fn test_round_trip_key_and_version(#[case] version: Option<u64>) {
        let account = Account {
            id: "a1".to_string(),
            balance: 12.5,
            version,
        };
        let item = encode_record(&account, EncodingPolicy::Current).unwrap();
        assert_eq!(
            hash_key(&ACCOUNT, &item).unwrap(),
            &AttributeValue::S("a1".to_string())
        );
        assert_eq!(self::version(&ACCOUNT, &item).unwrap(), version);
    }

    #[test]
    fn test_round_trip_record() {
        let account = Account {
            id: "a1".to_string(),
            balance: 12.5,
            version: Some(3),
        };
        let item = encode_record(&account, EncodingPolicy::Current).unwrap();
        let decoded: Account = record(item).unwrap();
        assert_eq!(decoded, account);
    }

    #[test]
    fn test_version_rejects_negative() {
        let item = collections::HashMap::from([(
            "version".to_string(),
            AttributeValue::N("-1".to_string()),
        )]);
        assert!(matches!(
            version(&ACCOUNT, &item),
            Err(Error::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_hash_key_missing_from_item() {
        let item = collections::HashMap::new();
        assert!(matches!(
            hash_key(&ACCOUNT, &item),
            Err(Error::MissingValue(_))
        ));
    }
}

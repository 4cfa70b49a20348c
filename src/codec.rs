//! Value codec.
//!
//! Converts typed values and records into DynamoDB attribute values, and
//! resolves the key and version fields of a record through its metadata.

/// Decode-adjacent helpers: key, version and whole-record recovery.
pub mod decode;

/// Encoding of values and records into attribute values.
pub mod encode;

/// Declarative record metadata: table, attribute names, key and version roles.
pub mod metadata;

/// The closed set of value shapes the codec accepts.
pub mod value;

/// Encoding scheme applied to booleans and collections.
///
/// The two schemes are incompatible: data written under one must be read back
/// under the same one.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum EncodingPolicy {
    /// Booleans as `N` (`0`/`1`); homogeneous collections as `NS`/`SS`/`BS`.
    Legacy,
    /// Booleans as `BOOL`; ordered collections as `L`; only sets as `NS`/`SS`/`BS`.
    #[default]
    Current,
}

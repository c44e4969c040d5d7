//! Parcel value corpus for Binder transaction arguments.
//!
//! The catalog is a fixed table mapping each supported parcel type to an
//! ordered list of literal argument renderings: normal values, boundary
//! values, and adversarial values (format strings, overlong strings,
//! non-finite floats). It is built once at startup and never mutated.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Parcel argument types accepted by `service call`.
///
/// Declaration order is the canonical enumeration order for schema
/// generation; changing it changes the command sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
    S16,
    Bool,
    Array,
    ByteBuffer,
    NestedParcel,
}

impl ValueType {
    /// All parcel types, in canonical enumeration order.
    pub const ALL: [ValueType; 9] = [
        ValueType::I32,
        ValueType::I64,
        ValueType::F32,
        ValueType::F64,
        ValueType::S16,
        ValueType::Bool,
        ValueType::Array,
        ValueType::ByteBuffer,
        ValueType::NestedParcel,
    ];

    /// The token this type is written as on the `service call` command line.
    pub fn wire_token(self) -> &'static str {
        match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f",
            ValueType::F64 => "d",
            ValueType::S16 => "s16",
            ValueType::Bool => "bool",
            ValueType::Array => "array",
            ValueType::ByteBuffer => "byte_buffer",
            ValueType::NestedParcel => "nested_parcel",
        }
    }

    /// Position of this type within [`ValueType::ALL`].
    pub fn ordinal(self) -> usize {
        match self {
            ValueType::I32 => 0,
            ValueType::I64 => 1,
            ValueType::F32 => 2,
            ValueType::F64 => 3,
            ValueType::S16 => 4,
            ValueType::Bool => 5,
            ValueType::Array => 6,
            ValueType::ByteBuffer => 7,
            ValueType::NestedParcel => 8,
        }
    }
}

/// Immutable table of literal argument values per parcel type.
///
/// Safe for concurrent read access; all lists are non-empty.
#[derive(Debug, Clone)]
pub struct ParcelValueCatalog {
    entries: BTreeMap<ValueType, Vec<String>>,
}

impl ParcelValueCatalog {
    /// Build the standard fuzzing corpus.
    pub fn standard() -> Self {
        let mut entries = BTreeMap::new();

        entries.insert(
            ValueType::I32,
            to_strings(&[
                "1",
                "0",
                "65535",
                "4294967294",
                "4294967295",
                "-1",
                "2147483647",
                "-2147483648",
                "123",
                "456",
                "-789",
            ]),
        );

        entries.insert(
            ValueType::I64,
            to_strings(&[
                "18446744073709551614",
                "18446744073709551615",
                "1",
                "0",
                "-1",
                "9223372036854775807",
                "-9223372036854775808",
                "9876543210",
                "-1234567890",
            ]),
        );

        entries.insert(
            ValueType::F32,
            to_strings(&[
                "-1.0", "3.141592", "1.0", "0.0", "inf", "-inf", "nan", "1.23", "-4.56",
            ]),
        );

        entries.insert(
            ValueType::F64,
            to_strings(&[
                "255",
                "4294967294",
                "-1.0",
                "3.141592653589793",
                "1.0",
                "0.0",
                "inf",
                "-inf",
                "nan",
                "2.718281828459045",
                "-3.141592653589793",
            ]),
        );

        entries.insert(
            ValueType::S16,
            vec![
                // Format-string probe
                "3%%n%%x%%s%s%%n1".to_string(),
                "A".repeat(10),
                "A ".repeat(4),
                // High-byte garbage
                "\u{ff}\u{ff}f\u{ff}\u{ff}\u{ff}\u{ff}\u{ff}\u{ff}\u{fc}".to_string(),
                String::new(),
                "NormalString".to_string(),
                "\u{ffff}".repeat(10),
                "SpecialChars!@#$%^&()".to_string(),
                "LongString".repeat(10),
            ],
        );

        entries.insert(ValueType::Bool, to_strings(&["true", "false"]));

        entries.insert(
            ValueType::Array,
            to_strings(&[
                "i32 1 2 3",
                "i64 1 2 3",
                "f 1.0 2.0 3.0",
                "d 1.0 2.0 3.0",
                "s16 'A' 'B' 'C'",
                "bool true false",
            ]),
        );

        entries.insert(
            ValueType::ByteBuffer,
            to_strings(&[
                "ByteBuffer.wrap(new byte[]{1, 2, 3})",
                "ByteBuffer.wrap(new byte[]{})",
                "ByteBuffer.wrap(new byte[]{0x00, 0x7F, (byte)0x80, (byte)0xFF})",
            ]),
        );

        entries.insert(
            ValueType::NestedParcel,
            to_strings(&["i32 1 s16 'Nested String'", "d 2.718 array 'i32 4 5 6'"]),
        );

        Self { entries }
    }

    /// Literal values for the given type, in fixed corpus order.
    ///
    /// Errors only if the catalog carries no entry for the variant. The
    /// standard catalog is total over [`ValueType::ALL`], so this is a
    /// guard against future type-set extension, not a runtime path.
    pub fn values_for(&self, ty: ValueType) -> Result<&[String]> {
        self.entries
            .get(&ty)
            .map(|v| v.as_slice())
            .ok_or_else(|| anyhow!("invalid parcel type: no values registered for {:?}", ty))
    }

    /// Number of types with registered value lists.
    pub fn type_count(&self) -> usize {
        self.entries.len()
    }

    /// Sum of all per-type value list lengths.
    pub fn total_values(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }
}

impl Default for ParcelValueCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_total_and_non_empty() {
        let catalog = ParcelValueCatalog::standard();
        assert_eq!(catalog.type_count(), ValueType::ALL.len());
        for ty in ValueType::ALL {
            let values = catalog.values_for(ty).expect("entry for every type");
            assert!(!values.is_empty(), "{:?} has an empty value list", ty);
        }
    }

    #[test]
    fn values_are_stable_across_calls() {
        let catalog = ParcelValueCatalog::standard();
        for ty in ValueType::ALL {
            let first: Vec<String> = catalog.values_for(ty).unwrap().to_vec();
            let second: Vec<String> = catalog.values_for(ty).unwrap().to_vec();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn corpus_sizes_match_fixed_lists() {
        let catalog = ParcelValueCatalog::standard();
        assert_eq!(catalog.values_for(ValueType::I32).unwrap().len(), 11);
        assert_eq!(catalog.values_for(ValueType::I64).unwrap().len(), 9);
        assert_eq!(catalog.values_for(ValueType::F32).unwrap().len(), 9);
        assert_eq!(catalog.values_for(ValueType::F64).unwrap().len(), 11);
        assert_eq!(catalog.values_for(ValueType::S16).unwrap().len(), 9);
        assert_eq!(catalog.values_for(ValueType::Bool).unwrap().len(), 2);
        assert_eq!(catalog.values_for(ValueType::Array).unwrap().len(), 6);
        assert_eq!(catalog.values_for(ValueType::ByteBuffer).unwrap().len(), 3);
        assert_eq!(catalog.values_for(ValueType::NestedParcel).unwrap().len(), 2);
        assert_eq!(catalog.total_values(), 62);
    }

    #[test]
    fn wire_tokens_match_service_call_syntax() {
        assert_eq!(ValueType::I32.wire_token(), "i32");
        assert_eq!(ValueType::F32.wire_token(), "f");
        assert_eq!(ValueType::F64.wire_token(), "d");
        assert_eq!(ValueType::S16.wire_token(), "s16");
        assert_eq!(ValueType::NestedParcel.wire_token(), "nested_parcel");
    }

    #[test]
    fn ordinals_follow_declaration_order() {
        for (i, ty) in ValueType::ALL.iter().enumerate() {
            assert_eq!(ty.ordinal(), i);
        }
    }
}

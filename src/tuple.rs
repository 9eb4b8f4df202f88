//! Tuples: ordered sequences of fields.
//!
//! A [`Tuple`] is a schema-free row: the engine places no constraints on the
//! number or types of its fields. Tuples own their fields; cloning is deep.
//!
//! Serialized form (text, whitespace-delimited):
//!
//! ```text
//! <field_count> <field_1> <field_2> ...
//! ```

use std::fmt;

use crate::field::Field;

/// Errors from tuple decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupleError {
    /// The serialized bytes do not decode to a well-formed tuple.
    Corrupt {
        /// What went wrong.
        detail: String,
    },
}

impl fmt::Display for TupleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TupleError::Corrupt { detail } => write!(f, "corrupt tuple: {}", detail),
        }
    }
}

impl std::error::Error for TupleError {}

/// A row of fields.
///
/// A tuple has no identity beyond its contents; two tuples with equal fields
/// are equal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tuple {
    fields: Vec<Field>,
}

impl Tuple {
    /// Creates an empty tuple.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends a field to the end of the tuple.
    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Returns the number of fields (the tuple's arity).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the tuple has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the fields as a slice.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Consumes the tuple and returns its fields.
    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    /// Sum of the fields' encoded value lengths.
    ///
    /// Pages use this to estimate whether a tuple fits; the serialized text
    /// form is what actually lands on the page.
    pub fn data_size(&self) -> usize {
        self.fields.iter().map(Field::data_size).sum()
    }

    /// Serializes the tuple to its text form.
    pub fn serialize(&self) -> String {
        use fmt::Write;
        let mut out = String::new();
        let _ = write!(out, "{} ", self.fields.len());
        for field in &self.fields {
            field.serialize_into(&mut out);
        }
        out
    }

    /// Decodes a tuple from serialized bytes.
    ///
    /// Trailing bytes past the encoded field count are ignored; a slot may be
    /// longer than the tuple it holds after slot reuse.
    ///
    /// # Errors
    ///
    /// Fails with [`TupleError::Corrupt`] if the bytes are not valid UTF-8,
    /// the field count is missing or unparsable, or any field fails to
    /// decode.
    pub fn deserialize(bytes: &[u8]) -> Result<Tuple, TupleError> {
        let text = std::str::from_utf8(bytes).map_err(|_| TupleError::Corrupt {
            detail: "not valid UTF-8".to_string(),
        })?;
        let mut tokens = text.split_ascii_whitespace();

        let count: usize = tokens
            .next()
            .and_then(|tok| tok.parse().ok())
            .ok_or_else(|| TupleError::Corrupt {
                detail: "missing or invalid field count".to_string(),
            })?;

        let mut tuple = Tuple::new();
        for i in 0..count {
            let field = Field::deserialize(&mut tokens).ok_or_else(|| TupleError::Corrupt {
                detail: format!("field {} of {} failed to decode", i, count),
            })?;
            tuple.push(field);
        }
        Ok(tuple)
    }
}

impl From<Vec<Field>> for Tuple {
    fn from(fields: Vec<Field>) -> Self {
        Self { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tuple {
        Tuple::from(vec![
            Field::Int(7),
            Field::Float(2.5),
            Field::Str("tag".into()),
        ])
    }

    #[test]
    fn test_serialize_format() {
        let t = Tuple::from(vec![Field::Int(1), Field::Int(2)]);
        assert_eq!(t.serialize(), "2 0 4 1 0 4 2 ");
    }

    #[test]
    fn test_roundtrip() {
        let t = sample();
        let decoded = Tuple::deserialize(t.serialize().as_bytes()).unwrap();
        assert_eq!(decoded, t);
    }

    #[test]
    fn test_roundtrip_empty() {
        let t = Tuple::new();
        assert_eq!(Tuple::deserialize(t.serialize().as_bytes()).unwrap(), t);
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut encoded = sample().serialize();
        encoded.push_str("2 4 stale-slot-data ");
        let decoded = Tuple::deserialize(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_corrupt_count() {
        assert!(Tuple::deserialize(b"").is_err());
        assert!(Tuple::deserialize(b"x 0 4 1 ").is_err());
    }

    #[test]
    fn test_corrupt_field() {
        // Count claims two fields but only one decodes.
        assert!(Tuple::deserialize(b"2 0 4 1 ").is_err());
        // Unknown type tag.
        assert!(Tuple::deserialize(b"1 9 4 1 ").is_err());
    }

    #[test]
    fn test_data_size() {
        assert_eq!(sample().data_size(), 4 + 4 + 4);
    }
}

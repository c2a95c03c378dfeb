use std::fmt;

use super::EmvError;

/// Character classes a data object value may be drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// `0-9`
    Numeric,
    /// Letters, digits, ASCII whitespace and `.!?\-`
    AlphanumericSpecial,
    /// Any UTF-8; length counted in characters.
    String,
}

impl DataKind {
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            DataKind::Numeric => value.chars().all(|c| c.is_ascii_digit()),
            DataKind::AlphanumericSpecial => value
                .chars()
                .all(|c| c.is_ascii_alphanumeric()
                    || c.is_ascii_whitespace()
                    || matches!(c, '.' | '!' | '?' | '\\' | '-')),
            DataKind::String => true,
        }
    }

    pub fn measure(&self, value: &str) -> usize {
        match self {
            DataKind::String => value.chars().count(),
            _ => value.len(),
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataKind::Numeric => "numeric",
            DataKind::AlphanumericSpecial => "alphanumeric",
            DataKind::String => "string",
        })
    }
}

/// One `ID | length | value` data object. The value is validated on
/// construction, so encoding cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataObject {
    tag: u8,
    value: String,
}

impl DataObject {
    pub fn new(
        tag: u8,
        kind: DataKind,
        value: impl Into<String>,
        max_len: usize,
    ) -> Result<Self, EmvError> {
        let value = value.into();
        if value.is_empty() {
            return Err(EmvError::Empty { tag });
        }
        if !kind.accepts(&value) {
            return Err(EmvError::InvalidCharacters { tag, kind });
        }
        let len = kind.measure(&value);
        let max = max_len.min(99);
        if len > max {
            return Err(EmvError::TooLong { tag, len, max });
        }
        Ok(Self { tag, value })
    }

    pub fn encode(&self) -> String {
        format!("{:02}{:02}{}", self.tag, self.value.chars().count(), self.value)
    }
}

pub fn encode_all<'a>(objects: impl IntoIterator<Item = &'a DataObject>) -> String {
    objects.into_iter().map(DataObject::encode).collect()
}

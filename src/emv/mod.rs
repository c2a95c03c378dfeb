//! EMVCo QR payload encoding with the Thai PromptPay merchant template.

pub mod data;
pub mod promptpay;
pub mod qr;

use thiserror::Error;

pub use data::{DataKind, DataObject};
pub use promptpay::{CreditTransfer, PresentedType, COUNTRY_THAILAND, CURRENCY_BAHT};
pub use qr::{crc16, Convenience, EmvQr, PointOfInitiation};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmvError {
    #[error("data object {tag:02} must not be empty")]
    Empty { tag: u8 },

    #[error("data object {tag:02} must be {kind}")]
    InvalidCharacters { tag: u8, kind: DataKind },

    #[error("data object {tag:02} is {len} long, max {max}")]
    TooLong { tag: u8, len: usize, max: usize },

    #[error("data object {tag:02} must be exactly {expected} characters")]
    InvalidLength { tag: u8, expected: usize },

    #[error("data object {tag:02} has an invalid amount")]
    InvalidAmount { tag: u8 },

    #[error("tag {tag:02} outside of {start:02}-{end:02}")]
    TagOutOfRange { tag: u8, start: u8, end: u8 },

    #[error("missing {0}")]
    MissingField(&'static str),
}

//! PromptPay credit-transfer merchant account template (EMV tag 29).

use super::data::{encode_all, DataKind, DataObject};
use super::EmvError;

pub const CURRENCY_BAHT: &str = "764";
pub const COUNTRY_THAILAND: &str = "TH";
pub const CREDIT_TRANSFER_TAG: u8 = 29;

const ID_AID: u8 = 0;
const ID_MOBILE_NUMBER: u8 = 1;
const ID_NATIONAL_ID: u8 = 2;
const ID_EWALLET_ID: u8 = 3;
const ID_BANK_ACCOUNT: u8 = 4;
const ID_OTA: u8 = 5;

const MAX_LENGTH_AID: usize = 16;
const MAX_LENGTH_MOBILE_NUMBER: usize = 13;
const MAX_LENGTH_NATIONAL_ID: usize = 13;
const MAX_LENGTH_EWALLET_ID: usize = 15;
const MAX_LENGTH_BANK_ACCOUNT: usize = 43;
const MAX_LENGTH_OTA: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentedType {
    MerchantPresented,
    CustomerPresented,
}

impl PresentedType {
    pub fn aid(&self) -> &'static str {
        match self {
            PresentedType::MerchantPresented => "A000000677010111",
            PresentedType::CustomerPresented => "A000000677010114",
        }
    }
}

/// Account identifiers for a PromptPay transfer. At least one of mobile
/// number, national id, e-wallet id or bank account must be set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditTransfer {
    aid: DataObject,
    presented: PresentedType,
    mobile: Option<DataObject>,
    national_id: Option<DataObject>,
    e_wallet_id: Option<DataObject>,
    bank_account: Option<DataObject>,
    ota: Option<DataObject>,
}

impl CreditTransfer {
    pub fn new(presented: PresentedType) -> Result<Self, EmvError> {
        Ok(Self {
            aid: DataObject::new(ID_AID, DataKind::AlphanumericSpecial, presented.aid(), MAX_LENGTH_AID)?,
            presented,
            mobile: None,
            national_id: None,
            e_wallet_id: None,
            bank_account: None,
            ota: None,
        })
    }

    /// Thai mobile numbers are carried as `0066` + the number without its
    /// leading zero, left-padded to 13 digits.
    pub fn with_mobile_number(mut self, mobile: &str) -> Result<Self, EmvError> {
        let normalized = normalize_mobile_number(mobile);
        self.mobile = Some(DataObject::new(
            ID_MOBILE_NUMBER,
            DataKind::Numeric,
            normalized,
            MAX_LENGTH_MOBILE_NUMBER,
        )?);
        Ok(self)
    }

    pub fn with_national_id(mut self, national_id: &str) -> Result<Self, EmvError> {
        self.national_id = Some(DataObject::new(
            ID_NATIONAL_ID,
            DataKind::Numeric,
            national_id,
            MAX_LENGTH_NATIONAL_ID,
        )?);
        Ok(self)
    }

    pub fn with_e_wallet_id(mut self, e_wallet_id: &str) -> Result<Self, EmvError> {
        self.e_wallet_id = Some(DataObject::new(
            ID_EWALLET_ID,
            DataKind::Numeric,
            e_wallet_id,
            MAX_LENGTH_EWALLET_ID,
        )?);
        Ok(self)
    }

    pub fn with_bank_account(mut self, bank_account: &str) -> Result<Self, EmvError> {
        self.bank_account = Some(DataObject::new(
            ID_BANK_ACCOUNT,
            DataKind::Numeric,
            bank_account,
            MAX_LENGTH_BANK_ACCOUNT,
        )?);
        Ok(self)
    }

    /// One-time authorization; only emitted for customer-presented templates.
    pub fn with_ota(mut self, ota: &str) -> Result<Self, EmvError> {
        self.ota = Some(DataObject::new(ID_OTA, DataKind::Numeric, ota, MAX_LENGTH_OTA)?);
        Ok(self)
    }

    pub fn encode(&self) -> Result<String, EmvError> {
        let identifiers = [
            &self.mobile,
            &self.national_id,
            &self.e_wallet_id,
            &self.bank_account,
        ];
        if identifiers.iter().all(|o| o.is_none()) {
            return Err(EmvError::MissingField("PromptPay account identifier"));
        }

        let ota = match self.presented {
            PresentedType::CustomerPresented => self.ota.as_ref(),
            PresentedType::MerchantPresented => None,
        };

        let objects = std::iter::once(&self.aid)
            .chain(identifiers.into_iter().flatten())
            .chain(ota);
        Ok(encode_all(objects))
    }
}

fn normalize_mobile_number(mobile: &str) -> String {
    if mobile.len() >= MAX_LENGTH_MOBILE_NUMBER {
        return mobile.to_string();
    }
    let national = match mobile.strip_prefix('0') {
        Some(rest) => format!("66{rest}"),
        None => mobile.to_string(),
    };
    format!("{national:0>13}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_number_is_normalized() {
        assert_eq!(normalize_mobile_number("0812345678"), "0066812345678");
        assert_eq!(normalize_mobile_number("66812345678"), "0066812345678");
    }

    #[test]
    fn full_length_mobile_number_is_kept() {
        assert_eq!(normalize_mobile_number("0066812345678"), "0066812345678");
        let template = CreditTransfer::new(PresentedType::MerchantPresented)
            .unwrap()
            .with_mobile_number("0066812345678")
            .unwrap();
        assert_eq!(
            template.encode().unwrap(),
            "0016A00000067701011101130066812345678"
        );
    }

    #[test]
    fn encodes_merchant_presented_mobile() {
        let template = CreditTransfer::new(PresentedType::MerchantPresented)
            .unwrap()
            .with_mobile_number("0812345678")
            .unwrap();
        assert_eq!(
            template.encode().unwrap(),
            "0016A00000067701011101130066812345678"
        );
    }

    #[test]
    fn ota_only_for_customer_presented() {
        let merchant = CreditTransfer::new(PresentedType::MerchantPresented)
            .unwrap()
            .with_national_id("1234567890123")
            .unwrap()
            .with_ota("1234")
            .unwrap();
        assert!(!merchant.encode().unwrap().contains("05041234"));

        let customer = CreditTransfer::new(PresentedType::CustomerPresented)
            .unwrap()
            .with_national_id("1234567890123")
            .unwrap()
            .with_ota("1234")
            .unwrap();
        let encoded = customer.encode().unwrap();
        assert!(encoded.starts_with("0016A000000677010114"));
        assert!(encoded.ends_with("05041234"));
    }

    #[test]
    fn requires_an_account_identifier() {
        let template = CreditTransfer::new(PresentedType::MerchantPresented).unwrap();
        assert_eq!(
            template.encode(),
            Err(EmvError::MissingField("PromptPay account identifier"))
        );
    }

    #[test]
    fn rejects_non_numeric_mobile() {
        let err = CreditTransfer::new(PresentedType::MerchantPresented)
            .unwrap()
            .with_mobile_number("08-1234-5678")
            .unwrap_err();
        assert!(matches!(err, EmvError::InvalidCharacters { tag: 1, .. }));
    }
}

//! EMVCo merchant-presented QR payload assembly.

use crc::{Crc, CRC_16_IBM_3740};
use std::collections::BTreeMap;

use super::data::{DataKind, DataObject};
use super::promptpay::CreditTransfer;
use super::EmvError;

const ID_PAYLOAD_FORMAT_INDICATOR: u8 = 0;
const ID_POINT_OF_INITIATION_METHOD: u8 = 1;
const ID_MERCHANT_ACCOUNT_INFORMATION_START: u8 = 2;
const ID_MERCHANT_ACCOUNT_INFORMATION_END: u8 = 51;
const ID_MERCHANT_CATEGORY_CODE: u8 = 52;
const ID_TRANSACTION_CURRENCY: u8 = 53;
const ID_TRANSACTION_AMOUNT: u8 = 54;
const ID_TIP_OR_CONVENIENCE_INDICATOR: u8 = 55;
const ID_CONVENIENCE_FEE_FIXED: u8 = 56;
const ID_CONVENIENCE_FEE_PERCENTAGE: u8 = 57;
const ID_COUNTRY_CODE: u8 = 58;
const ID_MERCHANT_NAME: u8 = 59;
const ID_MERCHANT_CITY: u8 = 60;
const ID_POSTAL_CODE: u8 = 61;
const ID_CRC: u8 = 63;
const ID_RFU_START: u8 = 65;
const ID_RFU_END: u8 = 79;

// CRC-16/CCITT-FALSE: poly 0x1021, init 0xFFFF, no reflection
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointOfInitiation {
    /// Reusable code, amount entered by the payer.
    Static,
    /// Single-use code carrying a transaction amount.
    Dynamic,
}

impl PointOfInitiation {
    fn code(&self) -> &'static str {
        match self {
            PointOfInitiation::Static => "11",
            PointOfInitiation::Dynamic => "12",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Convenience {
    /// Payer is prompted for a tip.
    PromptTip,
    FixedFee(f64),
    /// Percentage between 0 and 100.
    PercentageFee(f64),
}

#[derive(Debug, Clone, Default)]
pub struct EmvQr {
    point_of_initiation: Option<DataObject>,
    merchant_accounts: BTreeMap<u8, DataObject>,
    merchant_category_code: Option<DataObject>,
    transaction_currency: Option<DataObject>,
    transaction_amount: Option<DataObject>,
    convenience: Vec<DataObject>,
    country_code: Option<DataObject>,
    merchant_name: Option<DataObject>,
    merchant_city: Option<DataObject>,
    postal_code: Option<DataObject>,
    rfu: BTreeMap<u8, DataObject>,
}

impl EmvQr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_point_of_initiation(&mut self, method: PointOfInitiation) -> Result<(), EmvError> {
        self.point_of_initiation = Some(DataObject::new(
            ID_POINT_OF_INITIATION_METHOD,
            DataKind::Numeric,
            method.code(),
            2,
        )?);
        Ok(())
    }

    /// Merchant account templates live in IDs 02-51.
    pub fn set_merchant_account(&mut self, tag: u8, template: &str) -> Result<(), EmvError> {
        if !(ID_MERCHANT_ACCOUNT_INFORMATION_START..=ID_MERCHANT_ACCOUNT_INFORMATION_END)
            .contains(&tag)
        {
            return Err(EmvError::TagOutOfRange {
                tag,
                start: ID_MERCHANT_ACCOUNT_INFORMATION_START,
                end: ID_MERCHANT_ACCOUNT_INFORMATION_END,
            });
        }
        self.merchant_accounts
            .insert(tag, DataObject::new(tag, DataKind::String, template, 99)?);
        Ok(())
    }

    pub fn set_promptpay(&mut self, transfer: &CreditTransfer) -> Result<(), EmvError> {
        self.set_merchant_account(super::promptpay::CREDIT_TRANSFER_TAG, &transfer.encode()?)
    }

    pub fn set_merchant_category_code(&mut self, mcc: &str) -> Result<(), EmvError> {
        if mcc.len() != 4 {
            return Err(EmvError::InvalidLength {
                tag: ID_MERCHANT_CATEGORY_CODE,
                expected: 4,
            });
        }
        self.merchant_category_code = Some(DataObject::new(
            ID_MERCHANT_CATEGORY_CODE,
            DataKind::Numeric,
            mcc,
            4,
        )?);
        Ok(())
    }

    /// ISO 4217 numeric currency code.
    pub fn set_transaction_currency(&mut self, currency: &str) -> Result<(), EmvError> {
        if currency.len() != 3 {
            return Err(EmvError::InvalidLength {
                tag: ID_TRANSACTION_CURRENCY,
                expected: 3,
            });
        }
        self.transaction_currency = Some(DataObject::new(
            ID_TRANSACTION_CURRENCY,
            DataKind::Numeric,
            currency,
            3,
        )?);
        Ok(())
    }

    pub fn set_transaction_amount(&mut self, amount: f64) -> Result<(), EmvError> {
        self.transaction_amount = Some(DataObject::new(
            ID_TRANSACTION_AMOUNT,
            DataKind::AlphanumericSpecial,
            format_amount(ID_TRANSACTION_AMOUNT, amount)?,
            13,
        )?);
        Ok(())
    }

    pub fn set_convenience(&mut self, convenience: Convenience) -> Result<(), EmvError> {
        let indicator = |code: &str| {
            DataObject::new(ID_TIP_OR_CONVENIENCE_INDICATOR, DataKind::Numeric, code, 2)
        };
        self.convenience = match convenience {
            Convenience::PromptTip => vec![indicator("01")?],
            Convenience::FixedFee(fee) => vec![
                indicator("02")?,
                DataObject::new(
                    ID_CONVENIENCE_FEE_FIXED,
                    DataKind::AlphanumericSpecial,
                    format_amount(ID_CONVENIENCE_FEE_FIXED, fee)?,
                    13,
                )?,
            ],
            Convenience::PercentageFee(pct) => {
                if !(0.0..=100.0).contains(&pct) {
                    return Err(EmvError::InvalidAmount {
                        tag: ID_CONVENIENCE_FEE_PERCENTAGE,
                    });
                }
                vec![
                    indicator("03")?,
                    DataObject::new(
                        ID_CONVENIENCE_FEE_PERCENTAGE,
                        DataKind::AlphanumericSpecial,
                        trim_decimal(&format!("{pct:.2}")),
                        5,
                    )?,
                ]
            }
        };
        Ok(())
    }

    /// ISO 3166-1 alpha-2 country code.
    pub fn set_country_code(&mut self, country: &str) -> Result<(), EmvError> {
        if country.len() != 2 {
            return Err(EmvError::InvalidLength {
                tag: ID_COUNTRY_CODE,
                expected: 2,
            });
        }
        self.country_code = Some(DataObject::new(
            ID_COUNTRY_CODE,
            DataKind::AlphanumericSpecial,
            country,
            2,
        )?);
        Ok(())
    }

    pub fn set_merchant_name(&mut self, name: &str) -> Result<(), EmvError> {
        self.merchant_name = Some(DataObject::new(
            ID_MERCHANT_NAME,
            DataKind::AlphanumericSpecial,
            name,
            25,
        )?);
        Ok(())
    }

    pub fn set_merchant_city(&mut self, city: &str) -> Result<(), EmvError> {
        self.merchant_city = Some(DataObject::new(
            ID_MERCHANT_CITY,
            DataKind::AlphanumericSpecial,
            city,
            15,
        )?);
        Ok(())
    }

    pub fn set_postal_code(&mut self, postal_code: &str) -> Result<(), EmvError> {
        self.postal_code = Some(DataObject::new(
            ID_POSTAL_CODE,
            DataKind::AlphanumericSpecial,
            postal_code,
            10,
        )?);
        Ok(())
    }

    /// Data objects reserved for future EMVCo use, IDs 65-79.
    pub fn add_rfu(&mut self, tag: u8, value: &str) -> Result<(), EmvError> {
        if !(ID_RFU_START..=ID_RFU_END).contains(&tag) {
            return Err(EmvError::TagOutOfRange {
                tag,
                start: ID_RFU_START,
                end: ID_RFU_END,
            });
        }
        self.rfu
            .insert(tag, DataObject::new(tag, DataKind::String, value, 99)?);
        Ok(())
    }

    /// Assemble the payload in ID order and append the CRC object (ID 63).
    pub fn payload(&self) -> Result<String, EmvError> {
        if self.merchant_accounts.is_empty() {
            return Err(EmvError::MissingField("merchant account information"));
        }
        let required = [
            (&self.merchant_category_code, "merchant category code"),
            (&self.transaction_currency, "transaction currency"),
            (&self.country_code, "country code"),
            (&self.merchant_name, "merchant name"),
            (&self.merchant_city, "merchant city"),
        ];
        if let Some((_, name)) = required.iter().find(|(obj, _)| obj.is_none()) {
            return Err(EmvError::MissingField(*name));
        }

        let format_indicator =
            DataObject::new(ID_PAYLOAD_FORMAT_INDICATOR, DataKind::Numeric, "01", 2)?;

        let mut out = format_indicator.encode();
        let ordered = self
            .point_of_initiation
            .iter()
            .chain(self.merchant_accounts.values())
            .chain(&self.merchant_category_code)
            .chain(&self.transaction_currency)
            .chain(&self.transaction_amount)
            .chain(&self.convenience)
            .chain(&self.country_code)
            .chain(&self.merchant_name)
            .chain(&self.merchant_city)
            .chain(&self.postal_code)
            .chain(self.rfu.values());
        for obj in ordered {
            out.push_str(&obj.encode());
        }

        out.push_str(&format!("{ID_CRC:02}04"));
        let crc = crc16(out.as_bytes());
        out.push_str(&format!("{crc:04X}"));
        Ok(out)
    }
}

fn format_amount(tag: u8, amount: f64) -> Result<String, EmvError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(EmvError::InvalidAmount { tag });
    }
    Ok(format!("{amount:.2}"))
}

fn trim_decimal(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

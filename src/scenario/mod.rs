pub mod payload;
pub mod promptpay;

pub use payload::{Payload, PayloadError};
pub use promptpay::PromptPayScenario;

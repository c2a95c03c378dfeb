mod end_to_end;
mod iteration;

use promptpay_loadtest::harness::{RunContext, VuContext};
use std::io::Write;
use std::time::Duration;

pub const SAMPLE_PAYLOAD: &str =
    r#"{"transaction_amount": 100.5, "mobile_number": "0812345678", "merchant_name": "Sample Shop"}"#;

pub fn run_context() -> RunContext {
    RunContext::new(Duration::from_secs(5)).unwrap()
}

pub fn vu(run: &RunContext) -> VuContext {
    VuContext {
        id: 1,
        iteration: 0,
        run: run.clone(),
    }
}

pub fn payload_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

use thiserror::Error;

/// Validation failures raised before any output is produced.
///
/// The formatter never partially emits a buffer: every error below is
/// detected up front and returned to the caller, which decides whether to
/// fall back to a plain-text receipt or abort the print job.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReceiptError {
    #[error("invalid line width: {0}")]
    InvalidWidth(String),

    #[error("invalid money value for {field}: {value}")]
    InvalidMoneyValue { field: &'static str, value: f64 },

    #[error("incomplete card slip: {0}")]
    IncompleteCardSlip(String),
}

impl From<ReceiptError> for String {
    fn from(err: ReceiptError) -> String {
        err.to_string()
    }
}

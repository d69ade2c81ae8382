use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoanError {
    #[error("invalid parameter: {field} ({reason})")]
    InvalidParameter { field: &'static str, reason: String },

    #[error(
        "negative amortization: payment ${payment:.2} does not cover interest ${interest:.2} in month {month}"
    )]
    DegenerateAmortization {
        payment: f64,
        interest: f64,
        month: u32,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl LoanError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        LoanError::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

pub type LoanResult<T> = Result<T, LoanError>;

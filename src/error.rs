use thiserror::Error;

#[derive(Error, Debug)]
pub enum IncomeReportError {
    #[error("Cannot format amount {value}: not a finite number")]
    Format { value: f64 },

    #[error("No income records for subject: {0}")]
    EmptyPeriod(String),

    #[error("Invalid quarter {0}: must be between 1 and 4")]
    InvalidQuarter(u8),

    #[error("Invalid percent threshold {0}: must be between 0.0 and 100.0")]
    InvalidThreshold(f64),

    #[error("Invalid period '{0}': expected YYYY-Qn")]
    PeriodParse(String),

    #[error("Validation error for subject '{subject}': {details}")]
    ValidationError { subject: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IncomeReportError>;

use thiserror::Error;

/// Failures that abort an analysis run. Nothing partial is reported for these.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Malformed input at row {row}: {reason}")]
    MalformedInput { row: usize, reason: String },

    #[error("Input has {count} transactions, maximum allowed is {max}")]
    ResourceExceeded { count: usize, max: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AnalysisError {
    pub fn malformed(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            row,
            reason: reason.into(),
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

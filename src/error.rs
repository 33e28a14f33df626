use thiserror::Error;

/// Failures that reach the caller of an assembly or of the HTTP API.
///
/// Transport and parse problems never show up here: a failed day is simply
/// a day without rows.
#[derive(Debug, Clone, Error)]
pub enum CursError {
    #[error("window length must be between 1 and {1} days, got {0}")]
    InvalidWindow(i64, i64),
    #[error("could not retrieve any data from the national bank")]
    NoData,
    #[error("select at least one currency")]
    NoSelection,
    #[error("csv export failed: {0}")]
    Csv(String),
}

impl From<csv::Error> for CursError {
    fn from(err: csv::Error) -> Self {
        CursError::Csv(err.to_string())
    }
}

//! Error types.
//!
//! - `DataError`: loader/aggregator failures, one per lattice size.
//! - `AppError`: what the binary reports (message + process exit code).
//!
//! Fit failures are not errors: the fitter reports them through
//! `domain::FitStatus` so the pipeline can keep going without an overlay.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::SizeKey;

/// Failure while reading or reshaping one lattice size's dataset.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `line` is 1-based and counts blank lines.
    #[error("{}:{line}: malformed row: {reason}", .path.display())]
    MalformedRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("dataset for L={size} has no rows")]
    EmptyDataset { size: SizeKey },
}

impl DataError {
    /// Exit code used when this error terminates the run.
    pub fn exit_code(&self) -> u8 {
        match self {
            DataError::Io { .. } | DataError::MalformedRow { .. } => 2,
            DataError::EmptyDataset { .. } => 3,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_row_message_names_file_and_line() {
        let err = DataError::MalformedRow {
            path: PathBuf::from("data/test_L8.txt"),
            line: 7,
            reason: "expected 5 fields, found 4".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "data/test_L8.txt:7: malformed row: expected 5 fields, found 4"
        );

        let app: AppError = err.into();
        assert_eq!(app.exit_code(), 2);
    }

    #[test]
    fn empty_dataset_maps_to_no_data_exit_code() {
        let app: AppError = DataError::EmptyDataset { size: SizeKey(16) }.into();
        assert_eq!(app.exit_code(), 3);
        assert_eq!(app.to_string(), "dataset for L=16 has no rows");
    }
}

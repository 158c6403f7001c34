use std::path::PathBuf;
use thiserror::Error;

use crate::jobs::JobStatus;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Unsupported file extension: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read document '{path}': {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to write document '{path}': {reason}")]
    Write { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request to translation provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Translation provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Translation provider returned no text")]
    EmptyResponse,
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {id} is {status}, cannot {action}")]
    InvalidState {
        id: String,
        status: JobStatus,
        action: &'static str,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Failed to store upload '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Error translating text: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl ServiceError {
    /// HTTP status the boundary layer reports for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Job(JobError::NotFound(_)) => 404,
            ServiceError::Job(JobError::InvalidState { .. })
            | ServiceError::Job(JobError::InvalidFilename(_))
            | ServiceError::Document(DocumentError::UnsupportedFormat(_))
            | ServiceError::Document(DocumentError::Read { .. })
            | ServiceError::InvalidInput(_) => 400,
            ServiceError::Job(JobError::Storage { .. })
            | ServiceError::Document(DocumentError::Write { .. })
            | ServiceError::Provider(_)
            | ServiceError::Task(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Student ID already exists!")]
    DuplicateId { id: String },

    #[error("No students registered yet!")]
    EmptyRegistry,

    #[error("unknown student id: {id}")]
    UnknownStudent { id: String },

    #[error("{0}")]
    BadParams(String),

    /// The attendance file exists but does not have the fixed layout.
    #[error("attendance log line {line}: {message}")]
    LogFormat { line: usize, message: String },

    #[error("student registry {path} is not valid JSON: {source}")]
    RegistryFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to lock workspace {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    #[error("invalid configuration: {message}")]
    ConfigValidation { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::BadParams(message.into())
    }

    /// Stable code sent to the front-end in `error.code`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateId { .. } => "duplicate_id",
            Self::EmptyRegistry => "empty_registry",
            Self::UnknownStudent { .. } => "unknown_student",
            Self::BadParams(_) => "bad_params",
            Self::LogFormat { .. } | Self::RegistryFormat { .. } => "store_corrupt",
            Self::Io { .. } | Self::Lock { .. } | Self::Json(_) => "io_failed",
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } => "config_invalid",
        }
    }
}

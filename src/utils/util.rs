use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed record: {0}")]
    Malformed(String),

    #[error("{source_name}:{line}: {reason}")]
    Format {
        source_name: String,
        line: usize,
        reason: String,
    },

    #[error("External tool failed: {0}")]
    Tool(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Htslib(#[from] rust_htslib::errors::Error),
}

impl Error {
    pub fn format(source_name: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        Error::Format {
            source_name: source_name.into(),
            line,
            reason: reason.into(),
        }
    }
}

pub fn handle_error_and_exit(err: Error) -> ! {
    log::error!("{}", err);
    std::process::exit(1);
}

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConnectError {
    /// Transport-level failure talking to an HTTP service, retries exhausted.
    Http { service: &'static str, message: String },
    /// Credentials rejected (401/403). Never retried.
    Auth { service: &'static str, status: u16, message: String },
    /// The service answered but the payload is unusable.
    Upstream { service: &'static str, message: String },
    /// Relational read/write failure.
    Db { context: &'static str, message: String },
    /// Mapping workbook missing, unreadable, or structurally broken.
    Workbook { path: PathBuf, message: String },
}

impl ConnectError {
    pub(crate) fn db(context: &'static str, err: rusqlite::Error) -> Self {
        Self::Db {
            context,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { service, message } => write!(f, "{service}: {message}"),
            Self::Auth { service, status, message } => {
                write!(f, "{service} auth failed ({status}): {message}")
            }
            Self::Upstream { service, message } => write!(f, "{service}: {message}"),
            Self::Db { context, message } => write!(f, "{context}: {message}"),
            Self::Workbook { path, message } => {
                write!(f, "workbook {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for ConnectError {}

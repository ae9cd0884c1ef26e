use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    /// Settings file could not be read.
    Read { path: PathBuf, message: String },
    /// TOML parse / deserialization error.
    Parse { path: PathBuf, message: String },
    /// No settings file found anywhere in the lookup chain.
    NotFound { searched: Vec<PathBuf> },
    /// A required token is neither in the file nor in its environment variable.
    MissingToken { which: &'static str, env: &'static str },
    /// Settings loaded but failed validation.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => {
                write!(f, "cannot read settings {}: {message}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "cannot parse settings {}: {message}", path.display())
            }
            Self::NotFound { searched } => {
                write!(f, "no settings file found (searched: ")?;
                for (i, p) in searched.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p.display())?;
                }
                write!(f, ")")
            }
            Self::MissingToken { which, env } => {
                write!(f, "{which} token missing: set it in the settings file or via {env}")
            }
            Self::Invalid(msg) => write!(f, "invalid settings: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

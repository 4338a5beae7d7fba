use thiserror::Error;

/// Main error type for the loop-finder library
#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio input errors
#[derive(Error, Debug)]
pub enum AudioError {
    /// The signal handed to the pipeline is unusable (no samples, zero sample rate)
    #[error("Invalid input: {details}")]
    InvalidInput { details: String },

    #[error("Failed to load audio file: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using LoopError
pub type Result<T> = std::result::Result<T, LoopError>;

impl LoopError {
    /// Shorthand for rejecting a malformed signal at the pipeline boundary
    pub fn invalid_input<S: Into<String>>(details: S) -> Self {
        Self::Audio(AudioError::InvalidInput { details: details.into() })
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Audio(AudioError::LoadFailed { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Audio(AudioError::LoadFailed { path }) => {
                format!("Could not load audio file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Audio(AudioError::UnsupportedFormat { format }) => {
                format!("Audio format '{}' is not supported. Try WAV, FLAC, MP3 or OGG.", format)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

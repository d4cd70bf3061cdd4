use thiserror::Error;

/// Main error type for the bootstrap workflow
#[derive(Error, Debug)]
pub enum InitError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Credential files missing: {0}")]
    MissingCredentials(String),

    // Control plane errors
    #[error("Failed to connect to server at {server}. Check the server address and try again.")]
    ServerUnreachable { server: String },

    #[error("Tumblebug health check failed with status {status}")]
    ServerUnhealthy { status: u16 },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Credential container errors
    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for InitError
pub type Result<T> = std::result::Result<T, InitError>;

/// Failures of the decryption gate. Only the last two are fatal.
#[derive(Error, Debug)]
pub enum DecryptionError {
    #[error("Decryption error: {0}")]
    Cipher(#[from] CipherError),

    #[error("Decrypted content is not valid UTF-8")]
    NotUtf8,

    #[error("Failed to read key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read password: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("Failed to read credentials file {path}: {source}")]
    Container {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decrypt the file after {attempts} attempts")]
    ExhaustedAttempts { attempts: u32 },

    #[error("Malformed credential document: {0}")]
    MalformedDocument(String),
}

/// Errors from the symmetric cipher primitive
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("bad magic number")]
    BadMagic,

    #[error("bad decrypt")]
    BadDecrypt,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

/// Why a common resource load did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceLoadFailure {
    #[error("{0}")]
    Request(String),

    #[error("No content returned")]
    NoContent,

    #[error("No output content returned")]
    NoOutput,

    #[error("Empty output content returned")]
    EmptyOutput,

    #[error("resource load task ended without a result")]
    Interrupted,
}

impl ResourceLoadFailure {
    /// True when the server answered but the body had the wrong shape.
    pub fn is_malformed_response(&self) -> bool {
        matches!(self, Self::NoContent | Self::NoOutput | Self::EmptyOutput)
    }
}

impl InitError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            InitError::Cancelled => 0,
            _ => 1,
        }
    }
}

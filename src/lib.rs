pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod control_plane;
pub mod document;
pub mod error;
pub mod gate;
pub mod loader;
pub mod logging;
pub mod output;
pub mod progress;
pub mod registrar;
pub mod report;

pub use bootstrap::Bootstrap;
pub use config::AppConfig;
pub use control_plane::{ControlPlane, CredentialRequest, TumblebugClient};
pub use document::{CredentialDocument, KeyValue, ProviderCredential};
pub use error::{CipherError, DecryptionError, InitError, ResourceLoadFailure, Result};
pub use gate::{
    obtain_credential_document, Decryptor, KeySource, OpensslAes256Cbc, SecretPrompt,
    TerminalPrompt,
};
pub use loader::{
    load_resources_with_progress, ResourceCounts, ResourceLoadOutcome, ResourceLoadReport,
};
pub use progress::{ProgressSink, ProgressState, TerminalProgress};
pub use registrar::{register_all, RegistrationOutcome, RegistrationStatus};
pub use report::Report;

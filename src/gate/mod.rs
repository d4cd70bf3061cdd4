//! Decryption gate: recover the credential document from the encrypted container.
//!
//! Keys are tried from an ordered list of [`KeySource`]s (the cached key file
//! first when present, then a bounded number of interactive prompts) and the
//! first one that decrypts wins. Key material and plaintext live in
//! [`Zeroizing`] buffers and are never logged.

pub mod cipher;

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::document::CredentialDocument;
use crate::error::DecryptionError;
use crate::output;

pub use cipher::{Decryptor, OpensslAes256Cbc};

/// Interactive attempts when no attempt count is configured.
pub const DEFAULT_PASSWORD_ATTEMPTS: u32 = 3;

/// Where a candidate decryption key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Key cached on disk by the credential tooling
    CachedKeyFile(PathBuf),
    /// Operator-entered password, attempt `attempt` of `of`
    Prompt { attempt: u32, of: u32 },
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::CachedKeyFile(path) => write!(f, "key file {}", path.display()),
            KeySource::Prompt { attempt, of } => write!(f, "password attempt {attempt}/{of}"),
        }
    }
}

/// Source of interactively entered secrets.
pub trait SecretPrompt {
    fn prompt_secret(&mut self, message: &str) -> std::io::Result<String>;
}

/// Reads from the controlling terminal without echo.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl SecretPrompt for TerminalPrompt {
    fn prompt_secret(&mut self, message: &str) -> std::io::Result<String> {
        rpassword::prompt_password(message)
    }
}

/// Ordered key sources: the cached key file if it exists, then `attempts` prompts.
pub fn key_sources(cached_key_path: Option<&Path>, attempts: u32) -> Vec<KeySource> {
    let cached = cached_key_path
        .filter(|path| path.is_file())
        .map(|path| KeySource::CachedKeyFile(path.to_path_buf()));

    cached
        .into_iter()
        .chain((1..=attempts).map(|attempt| KeySource::Prompt {
            attempt,
            of: attempts,
        }))
        .collect()
}

/// Walks key sources until one decrypts the container.
pub struct DecryptionGate<'a, D, P> {
    decryptor: &'a D,
    prompt: &'a mut P,
    holder: &'a str,
}

impl<'a, D: Decryptor, P: SecretPrompt> DecryptionGate<'a, D, P> {
    pub fn new(decryptor: &'a D, prompt: &'a mut P, holder: &'a str) -> Self {
        Self {
            decryptor,
            prompt,
            holder,
        }
    }

    /// Decrypt `container` with the first working key from `sources`.
    ///
    /// A malformed document after a successful decryption is fatal and not
    /// retried with the remaining sources.
    pub fn open(
        &mut self,
        container: &[u8],
        sources: &[KeySource],
    ) -> Result<CredentialDocument, DecryptionError> {
        let attempts = sources
            .iter()
            .filter(|s| matches!(s, KeySource::Prompt { .. }))
            .count() as u32;

        for source in sources {
            match self.try_source(container, source) {
                Ok(plaintext) => {
                    info!(source = %source, "credentials decrypted");
                    return CredentialDocument::parse(&plaintext, self.holder);
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "decryption attempt failed");
                    output::print_error(&e.to_string());
                }
            }
        }

        Err(DecryptionError::ExhaustedAttempts { attempts })
    }

    fn try_source(
        &mut self,
        container: &[u8],
        source: &KeySource,
    ) -> Result<Zeroizing<String>, DecryptionError> {
        let key = match source {
            KeySource::CachedKeyFile(path) => {
                let raw = Zeroizing::new(std::fs::read_to_string(path).map_err(|source| {
                    DecryptionError::KeyFile {
                        path: path.display().to_string(),
                        source,
                    }
                })?);
                output::print_warn(&format!(
                    "Using key from {} to decrypt the credentials file.",
                    path.display()
                ));
                Zeroizing::new(raw.trim().to_string())
            }
            KeySource::Prompt { attempt, of } => Zeroizing::new(
                self.prompt
                    .prompt_secret(&format!(
                        "Enter the password to decrypt the credentials file (attempt {attempt}/{of}): "
                    ))
                    .map_err(DecryptionError::Prompt)?,
            ),
        };

        let plaintext = self.decryptor.decrypt(container, &key)?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| DecryptionError::NotUtf8)?;
        Ok(Zeroizing::new(text.to_string()))
    }
}

/// Read the container and decrypt it using the cached key, then interactive prompts.
pub fn obtain_credential_document<D: Decryptor, P: SecretPrompt>(
    container_path: &Path,
    cached_key_path: Option<&Path>,
    attempts: u32,
    holder: &str,
    decryptor: &D,
    prompt: &mut P,
) -> Result<CredentialDocument, DecryptionError> {
    let container = std::fs::read(container_path).map_err(|source| DecryptionError::Container {
        path: container_path.display().to_string(),
        source,
    })?;
    let sources = key_sources(cached_key_path, attempts);
    DecryptionGate::new(decryptor, prompt, holder).open(&container, &sources)
}

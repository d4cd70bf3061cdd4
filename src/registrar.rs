//! Concurrent credential registration.
//!
//! One request per complete provider entry, at most `concurrency` in flight.
//! Outcomes are yielded in completion order and never omitted: N providers
//! always produce N outcomes.

use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::control_plane::{ControlPlane, CredentialRequest};
use crate::document::{CredentialDocument, ProviderCredential};

/// Default number of registrations in flight.
pub const DEFAULT_CONCURRENCY: usize = 5;

pub const INCOMPLETE_REASON: &str = "Incomplete credential data, Skip";

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationStatus {
    /// The control plane answered; its own success signaling is in the payload.
    Registered(Value),
    /// Not submitted.
    Skipped(String),
    /// Transport failure or unreadable response.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationOutcome {
    pub provider: String,
    pub status: RegistrationStatus,
}

impl RegistrationOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self.status, RegistrationStatus::Registered(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, RegistrationStatus::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, RegistrationStatus::Failed(_))
    }
}

impl std::fmt::Display for RegistrationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "- {}: ", self.provider)?;
        match &self.status {
            RegistrationStatus::Registered(payload) => write!(f, "{payload}"),
            RegistrationStatus::Skipped(reason) | RegistrationStatus::Failed(reason) => {
                write!(f, "{reason}")
            }
        }
    }
}

/// Register one provider. Incomplete entries never reach the network.
pub async fn register_one(
    client: &dyn ControlPlane,
    holder: &str,
    credential: &ProviderCredential,
) -> RegistrationOutcome {
    let provider = credential.provider.clone();

    if !credential.is_complete() {
        debug!(%provider, "skipping incomplete credential");
        return RegistrationOutcome {
            provider,
            status: RegistrationStatus::Skipped(INCOMPLETE_REASON.to_string()),
        };
    }

    let request = CredentialRequest::new(holder, credential);
    let status = match client.register_credential(&request).await {
        Ok(payload) => RegistrationStatus::Registered(payload),
        Err(e) => {
            warn!(%provider, error = %e, "credential registration failed");
            RegistrationStatus::Failed(format!("Error registering credentials: {e}"))
        }
    };

    RegistrationOutcome { provider, status }
}

/// Register every provider of `document`, calling `on_outcome` as each completes.
///
/// A failure for one provider never cancels the others and nothing is retried.
pub async fn register_all<F>(
    document: Arc<CredentialDocument>,
    client: Arc<dyn ControlPlane>,
    holder: &str,
    concurrency: usize,
    mut on_outcome: F,
) -> Vec<RegistrationOutcome>
where
    F: FnMut(&RegistrationOutcome),
{
    info!(
        providers = document.len(),
        concurrency, "registering credentials"
    );

    let mut in_flight = stream::iter(document.providers())
        .map(|credential| {
            let client = Arc::clone(&client);
            async move { register_one(client.as_ref(), holder, credential).await }
        })
        .buffer_unordered(concurrency.max(1));

    let mut outcomes = Vec::with_capacity(document.len());
    while let Some(outcome) = in_flight.next().await {
        on_outcome(&outcome);
        outcomes.push(outcome);
    }

    outcomes
}

//! Decrypted credential document.
//!
//! ```yaml
//! credentialholder:
//!   admin:
//!     aws:
//!       ClientId: AKIA...
//!       ClientSecret: ...
//!     gcp:
//!       ...
//! ```

use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Value;

use crate::error::DecryptionError;

const ROOT_KEY: &str = "credentialholder";

/// One key/value pair of a provider credential, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Credentials for a single cloud provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredential {
    pub provider: String,
    pub entries: Vec<KeyValue>,
}

impl ProviderCredential {
    pub fn new(provider: impl Into<String>, entries: Vec<KeyValue>) -> Self {
        Self {
            provider: provider.into(),
            entries,
        }
    }

    /// Every declared value is non-empty.
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|kv| !kv.value.is_empty())
    }
}

// Values are secrets; only key names are shown.
impl std::fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("provider", &self.provider)
            .field(
                "keys",
                &self.entries.iter().map(|kv| kv.key.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Providers for one credential holder, keyed by provider name in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialDocument {
    providers: IndexMap<String, ProviderCredential>,
}

impl CredentialDocument {
    /// Parse the YAML document and select the entries of `holder`.
    pub fn parse(yaml: &str, holder: &str) -> Result<Self, DecryptionError> {
        let root: Value = serde_yaml::from_str(yaml)
            .map_err(|e| DecryptionError::MalformedDocument(e.to_string()))?;

        let holders = root
            .get(ROOT_KEY)
            .ok_or_else(|| malformed(format!("missing '{ROOT_KEY}' section")))?;
        let providers = holders
            .get(holder)
            .ok_or_else(|| malformed(format!("no credentials for holder '{holder}'")))?;
        let providers = match providers {
            Value::Mapping(map) => map,
            Value::Null => return Ok(Self::default()),
            _ => return Err(malformed(format!("'{holder}' is not a mapping"))),
        };

        let mut document = Self::default();
        for (name, entries) in providers {
            let name = scalar_to_string(name)
                .ok_or_else(|| malformed("provider name is not a scalar".to_string()))?;
            let entries = match entries {
                Value::Mapping(map) => map
                    .iter()
                    .map(|(k, v)| -> Result<KeyValue, DecryptionError> {
                        let key = scalar_to_string(k)
                            .ok_or_else(|| malformed(format!("{name}: key is not a scalar")))?;
                        let value = scalar_to_string(v)
                            .ok_or_else(|| malformed(format!("{name}.{key}: value is not a scalar")))?;
                        Ok(KeyValue { key, value })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Value::Null => Vec::new(),
                _ => return Err(malformed(format!("'{name}' is not a mapping"))),
            };
            document
                .providers
                .insert(name.clone(), ProviderCredential::new(name, entries));
        }

        Ok(document)
    }

    pub fn from_providers(providers: impl IntoIterator<Item = ProviderCredential>) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|p| (p.provider.clone(), p))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn get(&self, provider: &str) -> Option<&ProviderCredential> {
        self.providers.get(provider)
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderCredential> {
        self.providers.values()
    }
}

fn malformed(reason: String) -> DecryptionError {
    DecryptionError::MalformedDocument(reason)
}

/// Null becomes the empty string; nested structures are rejected.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

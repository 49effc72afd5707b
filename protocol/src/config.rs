//! # Configuration & Constants
//!
//! Every default lives here. The JSON config file uses camelCase keys:
//!
//! ```json
//! {
//!   "nodeUrl": "http://127.0.0.1:8545",
//!   "tickMs": 1000,
//!   "transactionsPerSender": 1,
//!   "requestTimeoutMs": 10000,
//!   "defaultPayload": { "kind": "load" },
//!   "faucet": { "enabled": true, "listen": ":8080", "senderName": "treasury" },
//!   "senders": [
//!     { "name": "treasury", "publicKey": "…", "privateKey": "…",
//!       "recipients": ["…"], "amount": 10, "fee": 1, "version": 1 }
//!   ]
//! }
//! ```
//!
//! Zero-valued numeric fields mean "use the default", so a config file can
//! leave them out entirely.

use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::transaction::payload::Payload;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Interval between generator ticks when `tickMs` is unset.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Transactions issued per sender per tick when `transactionsPerSender` is unset.
pub const DEFAULT_TRANSACTIONS_PER_SENDER: u32 = 1;

/// Per-request timeout for every call to the node when `requestTimeoutMs` is unset.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Faucet listen address when `faucet.listen` is unset. A bare `:port`
/// binds every interface.
pub const DEFAULT_FAUCET_LISTEN: &str = ":8080";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything that can go wrong loading or validating a config file. All of
/// these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0} is required")]
    Missing(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A private key as it appears in the config file.
///
/// `Debug` is redacted so a stray `{:?}` on a sender never prints it.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(raw: String) -> Self {
        Self(raw)
    }

    /// The raw key text, for handing to a [`Signer`](crate::crypto::Signer).
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// One configured account and how the generator should use it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderConfig {
    #[serde(default)]
    pub name: String,
    /// Account address. Also the key the nonce allocator tracks.
    #[serde(default)]
    pub public_key: String,
    #[serde(default = "empty_secret")]
    pub private_key: SecretKey,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub fee: u64,
    /// Transaction version. Zero means [`DEFAULT_TX_VERSION`](crate::transaction::DEFAULT_TX_VERSION).
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub payload: Option<Payload>,
}

fn empty_secret() -> SecretKey {
    SecretKey(String::new())
}

/// The optional on-demand issuance endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaucetConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub listen: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub payload: Option<Payload>,
}

/// Top-level config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadConfig {
    #[serde(default)]
    pub node_url: String,
    #[serde(default)]
    pub tick_ms: u64,
    #[serde(default)]
    pub transactions_per_sender: u32,
    #[serde(default)]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub default_payload: Option<Payload>,
    #[serde(default)]
    pub faucet: FaucetConfig,
    #[serde(default)]
    pub senders: Vec<SenderConfig>,
}

impl LoadConfig {
    /// Reads, parses and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses and validates config text.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: LoadConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks everything the core relies on before it starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let node_url = self.node_url.trim();
        if node_url.is_empty() {
            return Err(ConfigError::Missing("nodeUrl".into()));
        }
        if !(node_url.starts_with("http://") || node_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "nodeUrl must be an http(s) URL, got {:?}",
                self.node_url
            )));
        }

        let mut names = HashSet::new();
        for (i, sender) in self.senders.iter().enumerate() {
            if sender.public_key.trim().is_empty() {
                return Err(ConfigError::Missing(format!("senders[{}].publicKey", i)));
            }
            if !sender.name.is_empty() && !names.insert(sender.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate sender name {:?}",
                    sender.name
                )));
            }
        }

        if self.faucet.enabled {
            self.faucet_sender()?;
        }

        Ok(())
    }

    pub fn tick(&self) -> Duration {
        if self.tick_ms == 0 {
            DEFAULT_TICK
        } else {
            Duration::from_millis(self.tick_ms)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        if self.request_timeout_ms == 0 {
            DEFAULT_REQUEST_TIMEOUT
        } else {
            Duration::from_millis(self.request_timeout_ms)
        }
    }

    pub fn transactions_per_sender(&self) -> u32 {
        if self.transactions_per_sender == 0 {
            DEFAULT_TRANSACTIONS_PER_SENDER
        } else {
            self.transactions_per_sender
        }
    }

    /// The socket address string the faucet binds to. `:8080` becomes
    /// `0.0.0.0:8080`.
    pub fn faucet_listen_addr(&self) -> String {
        let listen = if self.faucet.listen.trim().is_empty() {
            DEFAULT_FAUCET_LISTEN
        } else {
            self.faucet.listen.trim()
        };
        if listen.starts_with(':') {
            format!("0.0.0.0{}", listen)
        } else {
            listen.to_string()
        }
    }

    /// Resolves the sender the faucet issues from.
    pub fn faucet_sender(&self) -> Result<&SenderConfig, ConfigError> {
        if self.faucet.sender_name.is_empty() {
            return Err(ConfigError::Missing(
                "faucet.senderName (when faucet is enabled)".into(),
            ));
        }
        self.senders
            .iter()
            .find(|s| s.name == self.faucet.sender_name)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "sender named {:?} not found for faucet",
                    self.faucet.sender_name
                ))
            })
    }

    /// Distinct account addresses, in configuration order.
    pub fn accounts(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.senders
            .iter()
            .filter(|s| seen.insert(s.public_key.as_str()))
            .map(|s| s.public_key.clone())
            .collect()
    }
}

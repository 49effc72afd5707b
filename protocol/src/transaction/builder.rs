//! Transaction assembly: fill in the fields, hash, sign.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use super::payload::Payload;
use super::types::{Transaction, DEFAULT_TX_VERSION};
use crate::config::SenderConfig;
use crate::crypto::signatures::{SignError, Signer};

/// Reasons a transaction could not be built. Every variant is recoverable:
/// the caller rolls back the reservation and moves on.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("sender {sender} has no recipients configured")]
    NoRecipients { sender: String },

    #[error("signing failed: {0}")]
    Sign(#[from] SignError),
}

/// Assembles and signs a transaction for `sender` at `nonce`.
///
/// The version falls back to [`DEFAULT_TX_VERSION`] when the sender leaves
/// it at zero. The signature covers [`Transaction::hash`], so the returned
/// value is final.
pub fn build_transaction(
    sender: &SenderConfig,
    signer: &dyn Signer,
    nonce: u64,
    amount: u64,
    recipient: &str,
    payload: Payload,
) -> Result<Transaction, BuildError> {
    let mut tx = Transaction {
        v: effective_version(sender.version),
        from: sender.public_key.clone(),
        to: recipient.to_string(),
        amount,
        fee: sender.fee,
        sig: String::new(),
        nonce,
        payload,
    };

    tx.sig = signer.sign(sender.private_key.expose(), &tx.hash())?;
    Ok(tx)
}

/// Chooses a recipient for a generator transaction.
///
/// One candidate is used as-is, several are sampled uniformly, none is an
/// error.
pub fn pick_recipient(sender: &SenderConfig) -> Result<String, BuildError> {
    pick_recipient_with(sender, &mut rand::thread_rng())
}

pub fn pick_recipient_with<R: Rng + ?Sized>(
    sender: &SenderConfig,
    rng: &mut R,
) -> Result<String, BuildError> {
    match sender.recipients.as_slice() {
        [] => Err(BuildError::NoRecipients {
            sender: sender.name.clone(),
        }),
        [only] => Ok(only.clone()),
        many => many
            .choose(rng)
            .cloned()
            .ok_or_else(|| BuildError::NoRecipients {
                sender: sender.name.clone(),
            }),
    }
}

fn effective_version(configured: u32) -> u32 {
    if configured == 0 {
        DEFAULT_TX_VERSION
    } else {
        configured
    }
}

//! The signed transaction record and its canonical hash.

use serde::{Deserialize, Serialize};

use super::payload::Payload;
use crate::crypto::hash::blake3_hex;

/// Protocol version stamped on transactions whose sender leaves it unset.
pub const DEFAULT_TX_VERSION: u32 = 1;

/// A signed transfer, exactly as it goes over the wire.
///
/// Field order matches the node's JSON schema:
/// `{v, from, to, amount, fee, sig, nonce, payload}`.
///
/// Fields are private: the signature covers every other field, so the only
/// way to get a `Transaction` is [`build_transaction`](super::build_transaction)
/// (or deserializing one a node sent back). There are no setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub(crate) v: u32,
    pub(crate) from: String,
    pub(crate) to: String,
    pub(crate) amount: u64,
    pub(crate) fee: u64,
    pub(crate) sig: String,
    pub(crate) nonce: u64,
    #[serde(default)]
    pub(crate) payload: Payload,
}

impl Transaction {
    pub fn version(&self) -> u32 {
        self.v
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn signature(&self) -> &str {
        &self.sig
    }

    /// The canonical preimage: `v:from:to:amount:fee:nonce:payload`.
    ///
    /// Integers are base-10, the payload is its canonical JSON. The
    /// signature is not part of the preimage.
    pub fn preimage(&self) -> String {
        canonical_preimage(
            self.v,
            &self.from,
            &self.to,
            self.amount,
            self.fee,
            self.nonce,
            &self.payload,
        )
    }

    /// BLAKE3-256 of the preimage, lowercase hex. This is the transaction hash
    /// that gets signed and logged.
    pub fn hash(&self) -> String {
        blake3_hex(self.preimage().as_bytes())
    }
}

pub(crate) fn canonical_preimage(
    v: u32,
    from: &str,
    to: &str,
    amount: u64,
    fee: u64,
    nonce: u64,
    payload: &Payload,
) -> String {
    format!(
        "{}:{}:{}:{}:{}:{}:{}",
        v,
        from,
        to,
        amount,
        fee,
        nonce,
        payload.canonical_json()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Transaction {
        Transaction {
            v: 1,
            from: "alice".into(),
            to: "bob".into(),
            amount: 10,
            fee: 1,
            sig: String::new(),
            nonce: 5,
            payload: Payload::empty(),
        }
    }

    #[test]
    fn preimage_layout() {
        assert_eq!(sample().preimage(), "1:alice:bob:10:1:5:{}");
    }

    #[test]
    fn hash_is_pure() {
        assert_eq!(sample().hash(), sample().hash());
        assert_eq!(sample().hash(), blake3_hex(b"1:alice:bob:10:1:5:{}"));
    }

    #[test]
    fn every_field_changes_the_hash() {
        let base = sample().hash();
        let mutations: Vec<Box<dyn Fn(&mut Transaction)>> = vec![
            Box::new(|t| t.v = 2),
            Box::new(|t| t.from = "carol".into()),
            Box::new(|t| t.to = "dave".into()),
            Box::new(|t| t.amount = 11),
            Box::new(|t| t.fee = 2),
            Box::new(|t| t.nonce = 6),
            Box::new(|t| t.payload = Payload::try_from(json!({ "k": 1 })).unwrap()),
        ];
        for mutate in mutations {
            let mut tx = sample();
            mutate(&mut tx);
            assert_ne!(tx.hash(), base, "mutated tx {:?} kept the same hash", tx);
        }
    }

    #[test]
    fn signature_is_not_hashed() {
        let mut tx = sample();
        tx.sig = "abcd".into();
        assert_eq!(tx.hash(), sample().hash());
    }

    #[test]
    fn wire_format_field_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"v":1,"from":"alice","to":"bob","amount":10,"fee":1,"sig":"","nonce":5,"payload":{}}"#
        );
    }

    #[test]
    fn wire_format_roundtrip() {
        let tx = sample();
        let back: Transaction = serde_json::from_str(&serde_json::to_string(&tx).unwrap()).unwrap();
        assert_eq!(back, tx);
    }
}

//! Structured transaction payloads.
//!
//! A payload is an arbitrary JSON object carried alongside a transfer. It
//! participates in the transaction hash, and the ledger node recomputes that
//! hash from its own decoding of the payload, so the text form must match
//! what the node's Go `encoding/json` produces for a `map[string]any`:
//!
//! - compact, object keys sorted by byte order at every depth;
//! - every number is a float64, written in shortest round-trip form, with
//!   exponent notation only below `1e-6` or from `1e21` up (`1.0` is `1`,
//!   `1e2` is `100`, `1e21` is `1e+21`);
//! - `<`, `>`, `&`, U+2028 and U+2029 are `\u`-escaped, as are control
//!   characters other than `\b \f \n \r \t`.
//!
//! Absent and empty payloads are the same value and render as `{}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Write};

/// A JSON object payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// The empty payload, `{}`.
    pub fn empty() -> Self {
        Self(Map::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The deterministic text form used in the hash preimage.
    pub fn canonical_json(&self) -> String {
        self.to_string()
    }

    /// Picks the first non-empty candidate, in precedence order.
    ///
    /// Mirrors the override rules used by the generator (sender payload over
    /// default payload) and the faucet (request over faucet default over
    /// process default). Falls back to `{}` when every candidate is empty or
    /// absent.
    pub fn first_non_empty<'a, I>(candidates: I) -> Payload
    where
        I: IntoIterator<Item = Option<&'a Payload>>,
    {
        candidates
            .into_iter()
            .flatten()
            .find(|p| !p.is_empty())
            .cloned()
            .unwrap_or_default()
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Payload {
    type Error = Value;

    /// Accepts objects and `null` (as the empty payload). Anything else is
    /// handed back unchanged.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::empty()),
            other => Err(other),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", CanonicalObject(&self.0))
    }
}

struct CanonicalObject<'a>(&'a Map<String, Value>);

impl fmt::Display for CanonicalObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<(&String, &Value)> = self.0.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        f.write_str("{")?;
        for (i, (key, value)) in entries.into_iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write_string(f, key)?;
            write!(f, ":{}", Canonical(value))?;
        }
        f.write_str("}")
    }
}

struct Canonical<'a>(&'a Value);

impl fmt::Display for Canonical<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Object(map) => write!(f, "{}", CanonicalObject(map)),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", Canonical(item))?;
                }
                f.write_str("]")
            }
            Value::String(s) => write_string(f, s),
            Value::Number(n) => match n.as_f64() {
                Some(x) => write_float(f, x),
                None => write!(f, "{}", n),
            },
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => f.write_str("null"),
        }
    }
}

/// A float64 the way Go's `encoding/json` writes it.
fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    let abs = x.abs();
    if abs != 0.0 && !(1e-6..1e21).contains(&abs) {
        // Rust prints `1e21` / `1.5e-7`; Go wants `1e+21` / `1.5e-7`.
        let text = format!("{:e}", x);
        return match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => write!(f, "{}e+{}", mantissa, exp),
            _ => f.write_str(&text),
        };
    }
    // Display is shortest round-trip and never uses an exponent.
    write!(f, "{}", x)
}

/// A quoted string with Go's HTML-safe escaping.
fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\u{8}' => f.write_str("\\b")?,
            '\u{c}' => f.write_str("\\f")?,
            '<' | '>' | '&' | '\u{2028}' | '\u{2029}' => write!(f, "\\u{:04x}", c as u32)?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

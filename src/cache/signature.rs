//! Configuration fingerprint gating cache validity.
//!
//! A [`ConfigSignature`] captures everything that could change a fix run's
//! output for identical input: target and tool versions, formatting
//! conventions, and every active rule's options. The persisted cache is
//! valid only while the stored signature equals the active one; any
//! mismatch invalidates every cached file hash.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::tokens::code_hash;

/// Canonical signature of one active rule: a hash of its options plus the
/// canonicalized options themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSignature {
    pub options_hash: String,
    pub options: Value,
}

/// Immutable fingerprint of the configuration that produced a cache.
///
/// Constructed once per run from the resolved configuration and never
/// mutated afterwards. Two signatures are equal iff all fields match
/// exactly, including every rule's canonical options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSignature {
    target_version: String,
    tool_version: String,
    indent: String,
    line_ending: String,
    rules: BTreeMap<String, RuleSignature>,
}

impl ConfigSignature {
    /// Build a signature, canonicalizing every rule's option payload.
    pub fn new(
        target_version: impl Into<String>,
        tool_version: impl Into<String>,
        indent: impl Into<String>,
        line_ending: impl Into<String>,
        rules: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        let rules = rules
            .into_iter()
            .map(|(name, options)| {
                let options = canonicalize(options);
                let options_hash = hash_options(&options);
                (name, RuleSignature { options_hash, options })
            })
            .collect();

        Self {
            target_version: target_version.into(),
            tool_version: tool_version.into(),
            indent: indent.into(),
            line_ending: line_ending.into(),
            rules,
        }
    }

    pub fn target_version(&self) -> &str {
        &self.target_version
    }

    pub fn tool_version(&self) -> &str {
        &self.tool_version
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    pub fn line_ending(&self) -> &str {
        &self.line_ending
    }

    /// Active rules, deterministically ordered by name.
    pub fn rules(&self) -> &BTreeMap<String, RuleSignature> {
        &self.rules
    }
}

/// Normalize an options payload into a stable, JSON-encodable form.
///
/// Object keys are stored sorted (the default `serde_json` map is ordered by
/// key), arrays keep element order, and scalars pass through. The
/// normalization is idempotent: canonicalizing a canonical value yields the
/// same value, so signatures persisted across runs compare byte for byte.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect(),
        ),
        scalar => scalar,
    }
}

fn hash_options(options: &Value) -> String {
    // Serialization of a canonical value is deterministic, so the hash is a
    // stable fingerprint of the options.
    code_hash(&options.to_string())
}

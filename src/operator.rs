//! The operator contract: pure, metadata-carrying mutation functions.
//!
//! Every operator is `apply(seed_text, ctx, rng) -> ApplyResult`. Operators
//! never see the guard and never decide their own `op_id`/`status`/length
//! fields in the final trace — the registry (`crate::registry`) overwrites
//! those regardless of what an operator's own trace object says.

use crate::rng::MtRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Skipped,
    Invalid,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Skipped => "SKIPPED",
            Status::Invalid => "INVALID",
        }
    }
}

/// Static metadata an operator declares about itself. Registered operators
/// are validated against this shape before they can be selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorMeta {
    pub op_id: String,
    pub bucket_tags: Vec<String>,
    pub surface_compat: Vec<String>,
    pub risk_level: String,
    pub strength_range: (u8, u8),
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params_schema: Option<Value>,
}

const VALID_RISK_LEVELS: [&str; 3] = ["LOW", "MEDIUM", "HIGH"];

/// Mirrors the registry's own shape checks: non-empty `op_id`, a known
/// `risk_level`, and a `strength_range` whose lower bound does not exceed
/// its upper bound. `bucket_tags`/`surface_compat` being `Vec<String>` is
/// already enforced by the type system, unlike the dynamically-typed
/// reference this engine was modeled on.
pub fn validate_meta(meta: &OperatorMeta) -> Result<(), String> {
    if meta.op_id.trim().is_empty() {
        return Err("op_id must be a non-empty string".to_string());
    }
    if !VALID_RISK_LEVELS.contains(&meta.risk_level.as_str()) {
        return Err(format!(
            "risk_level {:?} is not one of {:?}",
            meta.risk_level, VALID_RISK_LEVELS
        ));
    }
    if meta.strength_range.0 > meta.strength_range.1 {
        return Err(format!(
            "strength_range {:?} has lower bound greater than upper bound",
            meta.strength_range
        ));
    }
    Ok(())
}

/// Everything an operator may read about the mutation it is being asked to
/// perform. `constraints` carries batch-level knobs (`max_chars`,
/// `schema_mode`, `placeholder`) plus any operator-specific keys a caller
/// supplied (`mode`, `format`, `min_lines_keep`, ...). `metadata` carries the
/// caller-supplied metadata map plus the engine-injected `testcase_id` and
/// `child_index` for this child.
#[derive(Debug, Clone)]
pub struct Context {
    pub bucket_id: String,
    pub surface: String,
    pub strength: u8,
    pub constraints: Map<String, Value>,
    pub metadata: Map<String, Value>,
}

impl Context {
    pub fn new(bucket_id: impl Into<String>, surface: impl Into<String>, strength: u8) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            surface: surface.into(),
            strength,
            constraints: Map::new(),
            metadata: Map::new(),
        }
    }

    pub fn with_constraint(mut self, key: impl Into<String>, value: Value) -> Self {
        self.constraints.insert(key.into(), value);
        self
    }

    pub fn str_param(&self, key: &str, default: &str) -> String {
        self.constraints
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    pub fn usize_param(&self, key: &str, default: usize) -> usize {
        self.constraints
            .get(key)
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(default)
    }

    /// Whether `text` would exceed the batch's `max_chars` constraint. Every
    /// operator must check this before returning `OK`: the contract is to
    /// skip rather than let the engine's guard silently truncate an
    /// oversized result.
    pub fn max_chars_exceeded(&self, text: &str) -> bool {
        text.chars().count() > self.usize_param("max_chars", 8000)
    }
}

/// The result of one operator invocation, prior to the registry's
/// trace-field enforcement.
#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub status: Status,
    pub child_text: String,
    pub trace: Map<String, Value>,
}

impl ApplyResult {
    pub fn ok(child_text: impl Into<String>, params: Map<String, Value>) -> Self {
        let mut trace = Map::new();
        trace.insert("params".to_string(), Value::Object(params));
        Self {
            status: Status::Ok,
            child_text: child_text.into(),
            trace,
        }
    }

    pub fn skipped(seed_text: &str, reason: &str) -> Self {
        let mut params = Map::new();
        params.insert("reason".to_string(), Value::String(reason.to_string()));
        let mut trace = Map::new();
        trace.insert("params".to_string(), Value::Object(params));
        Self {
            status: Status::Skipped,
            child_text: seed_text.to_string(),
            trace,
        }
    }
}

/// An operator is a named, pure mutation function plus its declared
/// metadata. Implementors hold no state between calls.
pub trait Operator: Send + Sync {
    fn meta(&self) -> &OperatorMeta;
    fn apply(&self, seed_text: &str, ctx: &Context, rng: &mut MtRng) -> ApplyResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_meta() -> OperatorMeta {
        OperatorMeta {
            op_id: "op.test".to_string(),
            bucket_tags: vec!["LLM01_PROMPT_INJECTION".to_string()],
            surface_compat: vec!["PROMPT_TEXT".to_string()],
            risk_level: "MEDIUM".to_string(),
            strength_range: (1, 5),
            params_schema: None,
        }
    }

    #[test]
    fn valid_meta_passes() {
        assert!(validate_meta(&sample_meta()).is_ok());
    }

    #[test]
    fn empty_op_id_is_rejected() {
        let mut meta = sample_meta();
        meta.op_id = "".to_string();
        assert!(validate_meta(&meta).is_err());
    }

    #[test]
    fn unknown_risk_level_is_rejected() {
        let mut meta = sample_meta();
        meta.risk_level = "LOW-MEDIUM".to_string();
        assert!(validate_meta(&meta).is_err());
    }

    #[test]
    fn inverted_strength_range_is_rejected() {
        let mut meta = sample_meta();
        meta.strength_range = (5, 1);
        assert!(validate_meta(&meta).is_err());
    }

    #[test]
    fn status_serializes_as_uppercase_json_string() {
        assert_eq!(serde_json::to_string(&Status::Ok).unwrap(), "\"OK\"");
        assert_eq!(serde_json::to_string(&Status::Skipped).unwrap(), "\"SKIPPED\"");
        assert_eq!(serde_json::to_string(&Status::Invalid).unwrap(), "\"INVALID\"");
    }
}

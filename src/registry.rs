//! Deterministic operator discovery and the single point where an
//! operator's output is forced to honor the engine's trace contract.
//!
//! Unlike the dynamic module-scanning reference this engine is modeled on,
//! operators here are gathered at compile time by `crate::operators::all`.
//! The registry still does everything a registry must: sort by `op_id`,
//! normalize metadata, reject duplicates, and wrap every `apply` call so
//! no operator can forge its own `op_id`/`status`/length fields.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::RegistryError;
use crate::operator::{validate_meta, ApplyResult, Context, Operator, OperatorMeta, Status};
use crate::rng::MtRng;
use crate::trace::{canonicalize_applied, ensure_min_trace_fields};

fn risk_rank(level: &str) -> u8 {
    match level {
        "LOW" => 0,
        "MEDIUM" => 1,
        "HIGH" => 2,
        _ => u8::MAX,
    }
}

/// A registered operator: its normalized metadata alongside the handle
/// that runs it.
pub struct OperatorHandle {
    meta: OperatorMeta,
    op: Arc<dyn Operator>,
}

impl OperatorHandle {
    pub fn meta(&self) -> &OperatorMeta {
        &self.meta
    }
}

pub struct OperatorRegistry {
    ops: BTreeMap<String, OperatorHandle>,
}

impl OperatorRegistry {
    /// Normalize, validate, and index a set of operators. In strict mode an
    /// invalid-metadata or duplicate-`op_id` operator aborts the whole load;
    /// otherwise the offending operator is dropped.
    pub fn load(ops: Vec<Arc<dyn Operator>>, strict: bool) -> Result<Self, RegistryError> {
        let mut by_id: BTreeMap<String, OperatorHandle> = BTreeMap::new();
        let mut ops = ops;
        ops.sort_by(|a, b| a.meta().op_id.cmp(&b.meta().op_id));

        for op in ops {
            let mut meta = op.meta().clone();
            meta.risk_level = meta.risk_level.to_uppercase();
            meta.bucket_tags.sort();
            meta.bucket_tags.dedup();
            meta.surface_compat.sort();
            meta.surface_compat.dedup();

            if let Err(reason) = validate_meta(&meta) {
                if strict {
                    return Err(RegistryError::InvalidMeta {
                        module: meta.op_id.clone(),
                        reason,
                    });
                }
                continue;
            }

            if by_id.contains_key(&meta.op_id) {
                if strict {
                    return Err(RegistryError::DuplicateOpId(meta.op_id.clone()));
                }
                continue;
            }

            by_id.insert(meta.op_id.clone(), OperatorHandle { meta, op });
        }

        Ok(Self { ops: by_id })
    }

    /// All registered operator metadata, sorted by `op_id`.
    pub fn list_ops(&self) -> Vec<&OperatorMeta> {
        self.ops.values().map(OperatorHandle::meta).collect()
    }

    pub fn get(&self, op_id: &str) -> Option<&OperatorHandle> {
        self.ops.get(op_id)
    }

    /// Operators compatible with `bucket`/`surface` and at or below
    /// `risk_max` (when given), sorted by `op_id`.
    pub fn filter(
        &self,
        bucket: Option<&str>,
        surface: Option<&str>,
        risk_max: Option<&str>,
    ) -> Vec<&OperatorHandle> {
        let risk_ceiling = risk_max.map(risk_rank).unwrap_or(u8::MAX);
        self.ops
            .values()
            .filter(|h| {
                bucket.map_or(true, |b| h.meta.bucket_tags.iter().any(|t| t == b))
                    && surface.map_or(true, |s| h.meta.surface_compat.iter().any(|t| t == s))
                    && risk_rank(&h.meta.risk_level) <= risk_ceiling
            })
            .collect()
    }

    /// Run `op_id` against `seed_text`, enforcing the trace contract
    /// regardless of what the operator itself populated: `op_id`, `status`,
    /// `len_before`, `len_after` are always overwritten here, `params` is
    /// defaulted if absent, and `params.applied` (if present) is sorted by
    /// `(kind, detail, index)`. A panicking operator becomes `INVALID`
    /// rather than unwinding past the registry.
    pub fn apply(&self, op_id: &str, seed_text: &str, ctx: &Context, rng: &mut MtRng) -> ApplyResult {
        let len_before = seed_text.chars().count();

        let handle = match self.ops.get(op_id) {
            Some(h) => h,
            None => {
                let mut trace = Map::new();
                ensure_min_trace_fields(&mut trace);
                trace.insert("op_id".to_string(), Value::String(op_id.to_string()));
                trace.insert(
                    "status".to_string(),
                    Value::String(Status::Invalid.as_str().to_string()),
                );
                trace.insert("len_before".to_string(), Value::from(len_before));
                trace.insert("len_after".to_string(), Value::from(len_before));
                trace.insert("notes".to_string(), Value::String("operator not found".to_string()));
                return ApplyResult {
                    status: Status::Invalid,
                    child_text: seed_text.to_string(),
                    trace,
                };
            }
        };

        if !handle.meta.bucket_tags.iter().any(|b| b == &ctx.bucket_id) {
            return Self::mismatch_result(op_id, seed_text, len_before, "bucket_mismatch");
        }
        if !handle.meta.surface_compat.iter().any(|s| s == &ctx.surface) {
            return Self::mismatch_result(op_id, seed_text, len_before, "surface_mismatch");
        }

        let op = Arc::clone(&handle.op);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| op.apply(seed_text, ctx, rng)));

        let mut result = match outcome {
            Ok(r) => r,
            Err(_) => ApplyResult {
                status: Status::Invalid,
                child_text: seed_text.to_string(),
                trace: Map::new(),
            },
        };

        ensure_min_trace_fields(&mut result.trace);
        canonicalize_applied(&mut result.trace);

        result
            .trace
            .insert("op_id".to_string(), Value::String(op_id.to_string()));
        result.trace.insert(
            "status".to_string(),
            Value::String(result.status.as_str().to_string()),
        );
        let len_after = result.child_text.chars().count();
        result.trace.insert("len_before".to_string(), Value::from(len_before));
        result.trace.insert("len_after".to_string(), Value::from(len_after));

        result
    }

    fn mismatch_result(op_id: &str, seed_text: &str, len_before: usize, reason: &str) -> ApplyResult {
        let mut params = Map::new();
        params.insert("reason".to_string(), Value::String(reason.to_string()));
        let mut trace = Map::new();
        trace.insert("params".to_string(), Value::Object(params));
        trace.insert("op_id".to_string(), Value::String(op_id.to_string()));
        trace.insert(
            "status".to_string(),
            Value::String(Status::Skipped.as_str().to_string()),
        );
        trace.insert("len_before".to_string(), Value::from(len_before));
        trace.insert("len_after".to_string(), Value::from(len_before));
        ApplyResult {
            status: Status::Skipped,
            child_text: seed_text.to_string(),
            trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{ApplyResult, Context};

    struct Echo;
    impl Operator for Echo {
        fn meta(&self) -> &OperatorMeta {
            static META: std::sync::OnceLock<OperatorMeta> = std::sync::OnceLock::new();
            META.get_or_init(|| OperatorMeta {
                op_id: "op.echo".to_string(),
                bucket_tags: vec!["B".to_string(), "A".to_string(), "A".to_string()],
                surface_compat: vec!["PROMPT_TEXT".to_string()],
                risk_level: "low".to_string(),
                strength_range: (1, 5),
                params_schema: None,
            })
        }
        fn apply(&self, seed_text: &str, _ctx: &Context, _rng: &mut MtRng) -> ApplyResult {
            ApplyResult::ok(seed_text.to_string(), Map::new())
        }
    }

    struct Panics;
    impl Operator for Panics {
        fn meta(&self) -> &OperatorMeta {
            static META: std::sync::OnceLock<OperatorMeta> = std::sync::OnceLock::new();
            META.get_or_init(|| OperatorMeta {
                op_id: "op.panics".to_string(),
                bucket_tags: vec!["A".to_string()],
                surface_compat: vec!["PROMPT_TEXT".to_string()],
                risk_level: "HIGH".to_string(),
                strength_range: (1, 5),
                params_schema: None,
            })
        }
        fn apply(&self, _seed_text: &str, _ctx: &Context, _rng: &mut MtRng) -> ApplyResult {
            panic!("boom")
        }
    }

    fn registry() -> OperatorRegistry {
        OperatorRegistry::load(vec![Arc::new(Echo), Arc::new(Panics)], true).unwrap()
    }

    #[test]
    fn normalizes_risk_level_and_dedupes_bucket_tags() {
        let reg = registry();
        let meta = reg.get("op.echo").unwrap().meta();
        assert_eq!(meta.risk_level, "LOW");
        assert_eq!(meta.bucket_tags, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn duplicate_op_id_is_rejected_in_strict_mode() {
        let err = OperatorRegistry::load(vec![Arc::new(Echo), Arc::new(Echo)], true);
        assert!(matches!(err, Err(RegistryError::DuplicateOpId(_))));
    }

    #[test]
    fn unknown_op_id_applies_to_invalid() {
        let reg = registry();
        let ctx = Context::new("A", "PROMPT_TEXT", 1);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = reg.apply("op.nonexistent", "hello", &ctx, &mut rng);
        assert_eq!(result.status, Status::Invalid);
        assert_eq!(result.child_text, "hello");
    }

    #[test]
    fn panicking_operator_becomes_invalid_not_a_process_crash() {
        let reg = registry();
        let ctx = Context::new("A", "PROMPT_TEXT", 1);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = reg.apply("op.panics", "hello", &ctx, &mut rng);
        assert_eq!(result.status, Status::Invalid);
        assert_eq!(result.trace["op_id"], "op.panics");
    }

    #[test]
    fn bucket_mismatch_is_skipped_not_invoked() {
        let reg = registry();
        let ctx = Context::new("OTHER_BUCKET", "PROMPT_TEXT", 1);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = reg.apply("op.echo", "hello", &ctx, &mut rng);
        assert_eq!(result.status, Status::Skipped);
        assert_eq!(result.trace["params"]["reason"], "bucket_mismatch");
    }

    #[test]
    fn surface_mismatch_is_skipped_not_invoked() {
        let reg = registry();
        let ctx = Context::new("A", "SYSTEM_MESSAGE", 1);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = reg.apply("op.echo", "hello", &ctx, &mut rng);
        assert_eq!(result.status, Status::Skipped);
        assert_eq!(result.trace["params"]["reason"], "surface_mismatch");
    }

    #[test]
    fn filter_respects_bucket_surface_and_risk_ceiling() {
        let reg = registry();
        let matches = reg.filter(Some("A"), Some("PROMPT_TEXT"), Some("MEDIUM"));
        let ids: Vec<&str> = matches.iter().map(|h| h.meta().op_id.as_str()).collect();
        assert_eq!(ids, vec!["op.echo"]);
    }
}

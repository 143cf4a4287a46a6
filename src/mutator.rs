//! Orchestrates a batch: for each of `n` children, derive a per-child RNG,
//! apply up to `k` selected operators in sequence, guard every intermediate
//! and final result, and record the full mutation trace.

use serde_json::{json, Map, Value};

use crate::guard::{guard, GuardConfig};
use crate::novelty::NoveltyTracker;
use crate::operator::{Context, Status};
use crate::registry::OperatorRegistry;
use crate::rng::derive_rng;
use crate::selector::Selector;
use crate::stats::StatsByBucket;

#[derive(Debug, Clone)]
pub struct MutatorConfig {
    pub seed_base: u64,
    pub bucket_id: String,
    pub surface: String,
    pub n: usize,
    pub k: usize,
    pub strength: u8,
    pub risk_max: Option<String>,
    pub max_chars: Option<usize>,
    pub schema_mode: bool,
    pub placeholder: String,
    /// Operator-specific knobs forwarded verbatim into every `Context`
    /// built for this batch (`mode`, `format`, `min_lines_keep`, ...).
    pub extra_params: Map<String, Value>,
    /// Caller-supplied metadata. `seed_id` (default `"seed"`) seeds the
    /// per-child `testcase_id`; the rest is forwarded into every `Context`.
    pub metadata: Map<String, Value>,
}

impl MutatorConfig {
    pub fn new(bucket_id: impl Into<String>, surface: impl Into<String>) -> Self {
        Self {
            seed_base: 1337,
            bucket_id: bucket_id.into(),
            surface: surface.into(),
            n: 10,
            k: 1,
            strength: 2,
            risk_max: None,
            max_chars: Some(8000),
            schema_mode: false,
            placeholder: "N/A".to_string(),
            extra_params: Map::new(),
            metadata: Map::new(),
        }
    }

    fn seed_id(&self) -> &str {
        self.metadata.get("seed_id").and_then(Value::as_str).unwrap_or("seed")
    }

    fn guard_config(&self) -> GuardConfig {
        GuardConfig::from_constraints(self.max_chars, self.schema_mode, &self.placeholder)
    }
}

#[derive(Debug, Clone)]
pub struct MutationOutput {
    pub child_text: String,
    pub mutation_trace: Vec<Map<String, Value>>,
    pub last_status: Status,
}

/// Build the `n` children for this batch. `registry`/`stats`/`novelty` are
/// shared across the whole run so recent-operator and novelty tracking
/// carries forward from child to child.
pub fn generate_children(
    cfg: &MutatorConfig,
    seed_text: &str,
    registry: &OperatorRegistry,
    selector: &mut dyn Selector,
    stats: &mut StatsByBucket,
    novelty: &mut NoveltyTracker,
) -> Vec<MutationOutput> {
    let guard_cfg = cfg.guard_config();

    let mut outputs = Vec::with_capacity(cfg.n);
    let seed_id = cfg.seed_id().to_string();

    for i in 0..cfg.n {
        let testcase_id = format!("{seed_id}:{i}");
        let mut rng = derive_rng(cfg.seed_base, &testcase_id);

        let (seed_guarded, seed_meta) = guard(seed_text, &guard_cfg);
        let mut current = seed_guarded;
        let mut trace: Vec<Map<String, Value>> = Vec::with_capacity(cfg.k + 1);
        let mut last_status = Status::Skipped;

        if seed_meta.guard_applied {
            let mut seed_trace = Map::new();
            seed_trace.insert("op_id".to_string(), json!("__guard__"));
            seed_trace.insert("status".to_string(), json!("OK"));
            seed_trace.insert("params".to_string(), json!({ "guard_meta": seed_meta }));
            seed_trace.insert("len_before".to_string(), json!(seed_text.chars().count()));
            seed_trace.insert("len_after".to_string(), json!(current.chars().count()));
            trace.push(seed_trace);
        }

        for _ in 0..cfg.k {
            let candidates = registry.filter(Some(&cfg.bucket_id), Some(&cfg.surface), cfg.risk_max.as_deref());
            let Some(selection) = selector.choose(&candidates, &cfg.bucket_id, stats, &mut rng) else {
                break;
            };

            let mut ctx = Context::new(cfg.bucket_id.clone(), cfg.surface.clone(), cfg.strength);
            ctx.constraints = cfg.extra_params.clone();
            ctx.constraints
                .insert("max_chars".to_string(), json!(guard_cfg.max_len));
            ctx.metadata = cfg.metadata.clone();
            ctx.metadata.insert("testcase_id".to_string(), json!(testcase_id));
            ctx.metadata.insert("child_index".to_string(), json!(i));

            let mut result = registry.apply(&selection.op_id, &current, &ctx, &mut rng);
            let (guarded_text, guard_meta) = guard(&result.child_text, &guard_cfg);

            if guard_meta.guard_applied {
                let params = result
                    .trace
                    .entry("params".to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(params_map) = params {
                    params_map.insert("guard_meta".to_string(), json!(guard_meta));
                }
                result.trace.insert("len_after".to_string(), json!(guarded_text.chars().count()));
            }

            current = guarded_text;
            last_status = result.status;
            stats.push_recent_op(&cfg.bucket_id, &selection.op_id);
            trace.push(result.trace);
        }

        let seen_before = novelty.mark_seen(&cfg.bucket_id, &current);
        if let Some(last_step) = trace.last_mut() {
            let snapshot = novelty
                .snapshot_one(&cfg.bucket_id)
                .map(|s| {
                    json!({
                        "total": s.total(),
                        "unique": s.unique(),
                        "seen_hits": s.seen_hits(),
                        "unique_ratio": s.unique_ratio(),
                    })
                })
                .unwrap_or_else(|| json!(null));
            let params = last_step
                .entry("params".to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(params_map) = params {
                params_map.insert(
                    "novelty".to_string(),
                    json!({ "seen_before": seen_before, "snapshot": snapshot }),
                );
            }
        }

        let (final_text, _) = guard(&current, &guard_cfg);
        outputs.push(MutationOutput {
            child_text: final_text,
            mutation_trace: trace,
            last_status,
        });
    }

    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators;
    use crate::registry::OperatorRegistry;
    use crate::selector::UniformSelector;

    #[test]
    fn generates_exactly_n_children() {
        let registry = OperatorRegistry::load(operators::all(), true).unwrap();
        let mut selector = UniformSelector;
        let mut stats = StatsByBucket::new();
        let mut novelty = NoveltyTracker::new();

        let mut cfg = MutatorConfig::new("LLM01_PROMPT_INJECTION", "PROMPT_TEXT");
        cfg.n = 5;
        cfg.k = 2;

        let children = generate_children(&cfg, "tell me a story", &registry, &mut selector, &mut stats, &mut novelty);
        assert_eq!(children.len(), 5);
        for child in &children {
            assert!(!child.mutation_trace.is_empty());
        }
    }

    #[test]
    fn same_seed_base_reproduces_identical_children() {
        let registry = OperatorRegistry::load(operators::all(), true).unwrap();
        let mut cfg = MutatorConfig::new("LLM01_PROMPT_INJECTION", "PROMPT_TEXT");
        cfg.n = 3;
        cfg.k = 2;

        let run = || {
            let mut selector = UniformSelector;
            let mut stats = StatsByBucket::new();
            let mut novelty = NoveltyTracker::new();
            generate_children(&cfg, "tell me a story", &registry, &mut selector, &mut stats, &mut novelty)
                .into_iter()
                .map(|c| c.child_text)
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn every_child_respects_max_chars() {
        let registry = OperatorRegistry::load(operators::all(), true).unwrap();
        let mut selector = UniformSelector;
        let mut stats = StatsByBucket::new();
        let mut novelty = NoveltyTracker::new();

        let mut cfg = MutatorConfig::new("LLM10_DOS", "PROMPT_TEXT");
        cfg.n = 10;
        cfg.k = 3;
        cfg.max_chars = Some(80);

        let children = generate_children(&cfg, "short seed", &registry, &mut selector, &mut stats, &mut novelty);
        for child in &children {
            assert!(child.child_text.chars().count() <= 80);
        }
    }
}

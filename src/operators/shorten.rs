//! Drops a strength-scaled fraction of lines at random, preserving order.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map};

use crate::operator::{ApplyResult, Context, Operator, OperatorMeta};
use crate::rng::MtRng;

fn keep_ratio_for_strength(strength: u8) -> f64 {
    match strength {
        1 => 0.90,
        2 => 0.75,
        3 => 0.60,
        4 => 0.45,
        _ => 0.30,
    }
}

pub struct Shorten;

impl Operator for Shorten {
    fn meta(&self) -> &OperatorMeta {
        static META: OnceLock<OperatorMeta> = OnceLock::new();
        META.get_or_init(|| OperatorMeta {
            op_id: "op_lex_shorten".to_string(),
            bucket_tags: vec!["LLM01_PROMPT_INJECTION".to_string(), "LLM05_INPUT_ROBUSTNESS".to_string()],
            surface_compat: vec!["PROMPT_TEXT".to_string()],
            risk_level: "MEDIUM".to_string(),
            strength_range: (1, 5),
            params_schema: None,
        })
    }

    fn apply(&self, seed_text: &str, ctx: &Context, rng: &mut MtRng) -> ApplyResult {
        if ctx.surface != "PROMPT_TEXT" {
            return ApplyResult::skipped(seed_text, "surface_mismatch");
        }
        let lines: Vec<&str> = seed_text.lines().collect();
        if lines.len() <= 1 {
            return ApplyResult::skipped(seed_text, "not_enough_lines");
        }
        let strength = ctx.strength.clamp(1, 5);
        let keep_ratio = keep_ratio_for_strength(strength);
        let min_lines_keep = ctx.usize_param("min_lines_keep", 1).clamp(1, lines.len());
        let target_keep = ((lines.len() as f64 * keep_ratio).round() as usize).clamp(min_lines_keep, lines.len());

        let mut indices: Vec<usize> = (0..lines.len()).collect();
        rng.shuffle(&mut indices);
        let keep_set: std::collections::HashSet<usize> = indices.into_iter().take(target_keep).collect();

        let kept: Vec<&str> = lines
            .iter()
            .enumerate()
            .filter(|(i, _)| keep_set.contains(i))
            .map(|(_, l)| *l)
            .collect();

        let mut child = kept.join("\n").trim().to_string();
        if child.is_empty() {
            child = lines.first().unwrap_or(&"").trim().to_string();
        }
        if child == seed_text {
            return ApplyResult::skipped(seed_text, "no_change");
        }
        if ctx.max_chars_exceeded(&child) {
            return ApplyResult::skipped(seed_text, "max_chars_exceeded");
        }
        let mut params = Map::new();
        params.insert("strength".to_string(), json!(strength));
        params.insert("kept_lines".to_string(), json!(target_keep));
        params.insert("total_lines".to_string(), json!(lines.len()));
        ApplyResult::ok(child, params)
    }
}

pub fn operator() -> Arc<dyn Operator> {
    Arc::new(Shorten)
}

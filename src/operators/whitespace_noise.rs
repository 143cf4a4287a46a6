//! Cumulative whitespace-noise transformations: spacing around periods,
//! then doubled spaces and newline-per-sentence, then full word
//! resegmentation at the top strength.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map};

use crate::operator::{ApplyResult, Context, Operator, OperatorMeta};
use crate::rng::MtRng;

pub struct WhitespaceNoise;

impl Operator for WhitespaceNoise {
    fn meta(&self) -> &OperatorMeta {
        static META: OnceLock<OperatorMeta> = OnceLock::new();
        META.get_or_init(|| OperatorMeta {
            op_id: "op_fmt_whitespace_noise".to_string(),
            bucket_tags: vec!["LLM05_INPUT_ROBUSTNESS".to_string()],
            surface_compat: vec!["PROMPT_TEXT".to_string(), "SYSTEM_MESSAGE".to_string()],
            risk_level: "MEDIUM".to_string(),
            strength_range: (1, 5),
            params_schema: None,
        })
    }

    fn apply(&self, seed_text: &str, ctx: &Context, _rng: &mut MtRng) -> ApplyResult {
        if !["PROMPT_TEXT", "SYSTEM_MESSAGE"].contains(&ctx.surface.as_str()) {
            return ApplyResult::skipped(seed_text, "surface_mismatch");
        }
        if seed_text.is_empty() {
            return ApplyResult::skipped(seed_text, "empty_input");
        }
        let strength = ctx.strength.clamp(1, 5);
        let mut applied: Vec<&str> = Vec::new();
        let mut text = seed_text.replace('.', ". ");
        applied.push("minor_spacing");

        if strength >= 3 {
            text = text.replace(' ', "  ").replace('.', ".\n");
            applied.push("newline_noise");
        }
        if strength == 5 {
            let words: Vec<&str> = text.split_whitespace().collect();
            text = words.join("\n\n");
            applied.push("heavy_resegmentation");
        }

        if ctx.max_chars_exceeded(&text) {
            return ApplyResult::skipped(seed_text, "max_chars_exceeded");
        }

        let mut params = Map::new();
        params.insert("strength".to_string(), json!(strength));
        params.insert("applied".to_string(), json!(applied));
        ApplyResult::ok(text, params)
    }
}

pub fn operator() -> Arc<dyn Operator> {
    Arc::new(WhitespaceNoise)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_strength_only_spaces_periods() {
        let op = WhitespaceNoise;
        let ctx = Context::new("LLM05_INPUT_ROBUSTNESS", "PROMPT_TEXT", 1);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = op.apply("a.b.c.", &ctx, &mut rng);
        assert_eq!(result.child_text, "a. b. c. ");
    }

    #[test]
    fn top_strength_applies_all_three_transforms() {
        let op = WhitespaceNoise;
        let ctx = Context::new("LLM05_INPUT_ROBUSTNESS", "PROMPT_TEXT", 5);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = op.apply("hello world. bye.", &ctx, &mut rng);
        let applied = result.trace["params"]["applied"].as_array().unwrap();
        assert_eq!(applied.len(), 3);
    }
}

//! Resegments sentences by punctuation, escalating into bulleted lists.
//! Always succeeds.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map};

use crate::operator::{ApplyResult, Context, Operator, OperatorMeta};
use crate::rng::MtRng;

pub struct PunctuationResegmentation;

impl Operator for PunctuationResegmentation {
    fn meta(&self) -> &OperatorMeta {
        static META: OnceLock<OperatorMeta> = OnceLock::new();
        META.get_or_init(|| OperatorMeta {
            op_id: "op_fmt_punctuation_resegmentation".to_string(),
            bucket_tags: vec!["LLM05_INPUT_ROBUSTNESS".to_string()],
            surface_compat: vec!["PROMPT_TEXT".to_string()],
            // The reference operator declares "LOW-MEDIUM", which is not a
            // member of the registry's risk_level enum. Normalized to MEDIUM.
            risk_level: "MEDIUM".to_string(),
            strength_range: (1, 5),
            params_schema: None,
        })
    }

    fn apply(&self, seed_text: &str, ctx: &Context, _rng: &mut MtRng) -> ApplyResult {
        let strength = ctx.strength.clamp(1, 5);
        let mut applied: Vec<&str> = Vec::new();
        let child = if strength <= 2 {
            applied.push("punct_replace");
            seed_text.replace('.', ";")
        } else {
            applied.push("bullet_resegment");
            let mut bullets: Vec<String> = seed_text
                .split('.')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!("- {s}"))
                .collect();
            if strength == 5 {
                applied.push("section_header");
                bullets.insert(0, "### Reformatted\n".to_string());
            }
            bullets.join("\n")
        };
        if ctx.max_chars_exceeded(&child) {
            return ApplyResult::skipped(seed_text, "max_chars_exceeded");
        }
        let mut params = Map::new();
        params.insert("strength".to_string(), json!(strength));
        params.insert("applied".to_string(), json!(applied));
        ApplyResult::ok(child, params)
    }
}

pub fn operator() -> Arc<dyn Operator> {
    Arc::new(PunctuationResegmentation)
}

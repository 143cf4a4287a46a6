//! Wraps the seed in escalating layers of instruction-boundary delimiters.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map};

use crate::operator::{ApplyResult, Context, Operator, OperatorMeta};
use crate::rng::MtRng;

pub struct BoundaryDelimiterInjection;

impl Operator for BoundaryDelimiterInjection {
    fn meta(&self) -> &OperatorMeta {
        static META: OnceLock<OperatorMeta> = OnceLock::new();
        META.get_or_init(|| OperatorMeta {
            op_id: "op_syn_boundary_delimiter_injection".to_string(),
            bucket_tags: vec!["LLM05_INPUT_ROBUSTNESS".to_string(), "LLM01_PROMPT_INJECTION".to_string()],
            surface_compat: vec!["PROMPT_TEXT".to_string(), "SYSTEM_MESSAGE".to_string()],
            risk_level: "MEDIUM".to_string(),
            strength_range: (1, 5),
            params_schema: Some(json!({"strength": "int(1..5)", "mode": ["wrap"]})),
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
        let (child, framing) = match strength {
            1 => (format!("BEGIN\n{seed_text}\nEND"), "single"),
            2 | 3 => (
                format!("BEGIN_INSTRUCTION\n{seed_text}\nEND_INSTRUCTION"),
                "split",
            ),
            4 => (
                format!("BEGIN_BLOCK\n<<<INSTRUCTION>>>\n{seed_text}\n<<<END_INSTRUCTION>>>\nEND_BLOCK"),
                "nested_1",
            ),
            _ => (
                format!(
                    "BEGIN_MESSAGE\nBEGIN_INSTRUCTION_BLOCK\n<<<INSTRUCTION>>>\n{seed_text}\n<<<END_INSTRUCTION>>>\nEND_INSTRUCTION_BLOCK\nEND_MESSAGE"
                ),
                "nested_2",
            ),
        };
        if ctx.max_chars_exceeded(&child) {
            return ApplyResult::skipped(seed_text, "max_chars_exceeded");
        }
        let mut params = Map::new();
        params.insert("strength".to_string(), json!(strength));
        params.insert("mode".to_string(), json!("wrap"));
        params.insert("surface".to_string(), json!(ctx.surface));
        params.insert("framing".to_string(), json!(framing));
        ApplyResult::ok(child, params)
    }
}

pub fn operator() -> Arc<dyn Operator> {
    Arc::new(BoundaryDelimiterInjection)
}

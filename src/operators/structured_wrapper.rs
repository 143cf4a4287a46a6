//! Wraps the seed as a JSON (or minimal hand-rolled YAML) envelope.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map, Value};

use crate::operator::{ApplyResult, Context, Operator, OperatorMeta};
use crate::rng::MtRng;

fn as_minimal_yaml(obj: &Value) -> String {
    match obj {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", scalar_text(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => scalar_text(other),
    }
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct StructuredWrapper;

impl Operator for StructuredWrapper {
    fn meta(&self) -> &OperatorMeta {
        static META: OnceLock<OperatorMeta> = OnceLock::new();
        META.get_or_init(|| OperatorMeta {
            op_id: "op_fmt_structured_wrapper_json_yaml".to_string(),
            bucket_tags: vec!["LLM05_OUTPUT_HANDLING".to_string(), "LLM05_INPUT_ROBUSTNESS".to_string()],
            surface_compat: vec!["PROMPT_TEXT".to_string()],
            risk_level: "MEDIUM".to_string(),
            strength_range: (1, 5),
            params_schema: Some(json!({"format": ["json", "yaml"]})),
        })
    }

    fn apply(&self, seed_text: &str, ctx: &Context, _rng: &mut MtRng) -> ApplyResult {
        if ctx.surface != "PROMPT_TEXT" {
            return ApplyResult::skipped(seed_text, "surface_mismatch");
        }
        if seed_text.is_empty() {
            return ApplyResult::skipped(seed_text, "empty_input");
        }
        let fmt = ctx.str_param("format", "json");
        let fmt = if fmt == "yaml" { "yaml" } else { "json" };
        let strength = ctx.strength.clamp(1, 5);

        let (obj, applied) = match strength {
            1 => (json!({"prompt": seed_text}), "single_field"),
            2 | 3 => (
                json!({"goal": "answer_user", "input": seed_text, "format": "plain_text"}),
                "multi_field",
            ),
            _ => (
                json!({
                    "meta": {"version": "v1"},
                    "task": {"goal": "answer_user", "input": seed_text},
                    "output": {"format": "plain_text", "hint": "structured"}
                }),
                "nested_schema",
            ),
        };

        let child = if fmt == "json" {
            if strength >= 3 {
                serde_json::to_string_pretty(&obj).unwrap_or_default()
            } else {
                serde_json::to_string(&obj).unwrap_or_default()
            }
        } else {
            as_minimal_yaml(&obj)
        };

        if ctx.max_chars_exceeded(&child) {
            return ApplyResult::skipped(seed_text, "max_chars_exceeded");
        }

        let mut params = Map::new();
        params.insert("strength".to_string(), json!(strength));
        params.insert("format".to_string(), json!(fmt));
        params.insert("applied".to_string(), json!([applied]));
        ApplyResult::ok(child, params)
    }
}

pub fn operator() -> Arc<dyn Operator> {
    Arc::new(StructuredWrapper)
}

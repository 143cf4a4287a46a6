//! Mutates the first few top-level values of a JSON object, type by type,
//! without changing its key set or overall shape.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map, Value};

use crate::operator::{ApplyResult, Context, Operator, OperatorMeta};
use crate::rng::MtRng;

fn mutate_value(v: &Value, strength: u8) -> Value {
    match v {
        Value::Number(n) if n.is_i64() || n.is_u64() => {
            json!(n.as_i64().unwrap_or(0) + strength as i64)
        }
        Value::Number(n) if n.is_f64() => {
            json!(n.as_f64().unwrap_or(0.0) + 0.1 * strength as f64)
        }
        Value::String(s) => json!(format!("{s} (modified)")),
        other => other.clone(),
    }
}

pub struct SchemaPreservingMutation;

impl Operator for SchemaPreservingMutation {
    fn meta(&self) -> &OperatorMeta {
        static META: OnceLock<OperatorMeta> = OnceLock::new();
        META.get_or_init(|| OperatorMeta {
            op_id: "op_constraint_schema_preserving_mutation".to_string(),
            bucket_tags: vec!["LLM05_OUTPUT_HANDLING".to_string(), "LLM05_INPUT_ROBUSTNESS".to_string()],
            surface_compat: vec!["PROMPT_TEXT".to_string(), "TOOL_ARGUMENTS".to_string()],
            risk_level: "MEDIUM".to_string(),
            strength_range: (1, 5),
            params_schema: None,
        })
    }

    fn apply(&self, seed_text: &str, ctx: &Context, _rng: &mut MtRng) -> ApplyResult {
        let parsed: Value = match serde_json::from_str(seed_text) {
            Ok(v) => v,
            Err(_) => return ApplyResult::skipped(seed_text, "json_parse_failed"),
        };
        let Value::Object(mut obj) = parsed else {
            return ApplyResult::skipped(seed_text, "json_parse_failed");
        };

        let strength = ctx.strength.clamp(1, 5);
        let keys: Vec<String> = obj.keys().cloned().collect();
        let mut applied = Vec::new();
        for key in keys.into_iter().take(strength as usize) {
            let mutated = mutate_value(&obj[&key], strength);
            obj.insert(key.clone(), mutated);
            applied.push(format!("mutated_{key}"));
        }

        let child = serde_json::to_string(&Value::Object(obj)).unwrap_or_default();
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
    Arc::new(SchemaPreservingMutation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutates_first_n_keys_where_n_is_strength() {
        let op = SchemaPreservingMutation;
        let ctx = Context::new("LLM05_OUTPUT_HANDLING", "TOOL_ARGUMENTS", 2);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = op.apply(r#"{"a":1,"b":"x","c":2}"#, &ctx, &mut rng);
        let applied = result.trace["params"]["applied"].as_array().unwrap();
        assert_eq!(applied.len(), 2);
    }

    #[test]
    fn skips_non_json_input() {
        let op = SchemaPreservingMutation;
        let ctx = Context::new("LLM05_OUTPUT_HANDLING", "TOOL_ARGUMENTS", 2);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = op.apply("not json", &ctx, &mut rng);
        assert_eq!(result.status, crate::operator::Status::Skipped);
    }
}

//! Inserts single spaces at random positions. Mirrors the reference
//! operator's quirk of not checking `surface_compat` in its own `apply`.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map};

use crate::operator::{ApplyResult, Context, Operator, OperatorMeta};
use crate::rng::MtRng;

pub struct WhitespacePerturb;

impl Operator for WhitespacePerturb {
    fn meta(&self) -> &OperatorMeta {
        static META: OnceLock<OperatorMeta> = OnceLock::new();
        META.get_or_init(|| OperatorMeta {
            op_id: "op_lex_whitespace_perturb".to_string(),
            bucket_tags: vec!["LLM01_PROMPT_INJECTION".to_string(), "LLM02_INSECURE_OUTPUT".to_string()],
            surface_compat: vec!["PROMPT_TEXT".to_string()],
            risk_level: "LOW".to_string(),
            strength_range: (1, 5),
            params_schema: None,
        })
    }

    fn apply(&self, seed_text: &str, ctx: &Context, rng: &mut MtRng) -> ApplyResult {
        if seed_text.is_empty() {
            return ApplyResult::skipped(seed_text, "empty_input");
        }
        let inserts = (ctx.strength as usize).max(1);
        let mut chars: Vec<char> = seed_text.chars().collect();
        for _ in 0..inserts {
            let pos = rng.randrange(1, chars.len() + 1);
            chars.insert(pos, ' ');
        }
        let child: String = chars.into_iter().collect();
        if ctx.max_chars_exceeded(&child) {
            return ApplyResult::skipped(seed_text, "max_chars_exceeded");
        }
        let mut params = Map::new();
        params.insert("inserts".to_string(), json!(inserts));
        ApplyResult::ok(child, params)
    }
}

pub fn operator() -> Arc<dyn Operator> {
    Arc::new(WhitespacePerturb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_at_least_one_space() {
        let op = WhitespacePerturb;
        let ctx = Context::new("LLM01_PROMPT_INJECTION", "PROMPT_TEXT", 1);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = op.apply("hello", &ctx, &mut rng);
        assert_eq!(result.child_text.chars().count(), 6);
    }

    #[test]
    fn skips_on_empty_input() {
        let op = WhitespacePerturb;
        let ctx = Context::new("LLM01_PROMPT_INJECTION", "PROMPT_TEXT", 1);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = op.apply("", &ctx, &mut rng);
        assert_eq!(result.status, crate::operator::Status::Skipped);
    }
}

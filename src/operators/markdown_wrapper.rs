//! Wraps the seed in increasingly elaborate markdown structure. Always
//! succeeds; never returns `SKIPPED`.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map};

use crate::operator::{ApplyResult, Context, Operator, OperatorMeta};
use crate::rng::MtRng;

pub struct MarkdownWrapper;

impl Operator for MarkdownWrapper {
    fn meta(&self) -> &OperatorMeta {
        static META: OnceLock<OperatorMeta> = OnceLock::new();
        META.get_or_init(|| OperatorMeta {
            op_id: "op_fmt_markdown_wrapper".to_string(),
            bucket_tags: vec!["LLM05_INPUT_ROBUSTNESS".to_string(), "LLM01_PROMPT_INJECTION".to_string()],
            surface_compat: vec!["PROMPT_TEXT".to_string()],
            risk_level: "MEDIUM".to_string(),
            strength_range: (1, 5),
            params_schema: None,
        })
    }

    fn apply(&self, seed_text: &str, ctx: &Context, _rng: &mut MtRng) -> ApplyResult {
        let strength = ctx.strength.clamp(1, 5);
        let (child, applied) = match strength {
            1 => (format!("> {seed_text}"), "quote"),
            2 | 3 => (format!("```text\n{seed_text}\n```"), "code_block"),
            _ => (
                format!("# Instruction\n\n## Task\n{seed_text}\n\n## Output\nProvide a structured answer."),
                "multi_section",
            ),
        };
        if ctx.max_chars_exceeded(&child) {
            return ApplyResult::skipped(seed_text, "max_chars_exceeded");
        }
        let mut params = Map::new();
        params.insert("strength".to_string(), json!(strength));
        params.insert("applied".to_string(), json!([applied]));
        ApplyResult::ok(child, params)
    }
}

pub fn operator() -> Arc<dyn Operator> {
    Arc::new(MarkdownWrapper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_one_quotes() {
        let op = MarkdownWrapper;
        let ctx = Context::new("LLM01_PROMPT_INJECTION", "PROMPT_TEXT", 1);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = op.apply("hi", &ctx, &mut rng);
        assert_eq!(result.child_text, "> hi");
    }

    #[test]
    fn strength_four_builds_multi_section() {
        let op = MarkdownWrapper;
        let ctx = Context::new("LLM01_PROMPT_INJECTION", "PROMPT_TEXT", 4);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = op.apply("hi", &ctx, &mut rng);
        assert!(result.child_text.starts_with("# Instruction"));
    }
}

//! Replaces a handful of Latin letters with visual lookalikes and sprinkles
//! in zero-width characters.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde_json::{json, Map, Value};

use crate::operator::{ApplyResult, Context, Operator, OperatorMeta};
use crate::rng::MtRng;

const ZERO_WIDTH: [&str; 3] = ["\u{200b}", "\u{200c}", "\u{200d}"];

fn homoglyphs() -> &'static HashMap<char, Vec<char>> {
    static MAP: OnceLock<HashMap<char, Vec<char>>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert('A', vec!['\u{0391}', '\u{0410}']);
        m.insert('B', vec!['\u{0392}', '\u{0412}']);
        m.insert('C', vec!['\u{03f9}', '\u{0421}']);
        m.insert('E', vec!['\u{0395}', '\u{0415}']);
        m.insert('H', vec!['\u{0397}', '\u{041d}']);
        m.insert('I', vec!['\u{0399}', '\u{0406}']);
        m.insert('J', vec!['\u{0408}']);
        m.insert('K', vec!['\u{039a}', '\u{041a}']);
        m.insert('M', vec!['\u{039c}', '\u{041c}']);
        m.insert('N', vec!['\u{039d}']);
        m.insert('O', vec!['\u{039f}', '\u{041e}']);
        m.insert('P', vec!['\u{03a1}', '\u{0420}']);
        m.insert('S', vec!['\u{0405}']);
        m.insert('T', vec!['\u{03a4}', '\u{0422}']);
        m.insert('X', vec!['\u{03a7}', '\u{0425}']);
        m.insert('Y', vec!['\u{03a5}', '\u{0423}']);
        m.insert('a', vec!['\u{0430}']);
        m.insert('c', vec!['\u{0441}']);
        m.insert('e', vec!['\u{0435}']);
        m.insert('i', vec!['\u{0456}']);
        m.insert('j', vec!['\u{0458}']);
        m.insert('o', vec!['\u{043e}']);
        m.insert('p', vec!['\u{0440}']);
        m.insert('s', vec!['\u{0455}']);
        m.insert('x', vec!['\u{0445}']);
        m.insert('y', vec!['\u{0443}']);
        m
    })
}

pub struct HomoglyphInjection;

impl Operator for HomoglyphInjection {
    fn meta(&self) -> &OperatorMeta {
        static META: OnceLock<OperatorMeta> = OnceLock::new();
        META.get_or_init(|| OperatorMeta {
            op_id: "op_lex_homoglyph_injection".to_string(),
            bucket_tags: vec!["LLM01_PROMPT_INJECTION".to_string()],
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
        if seed_text.is_empty() {
            return ApplyResult::skipped(seed_text, "empty_input");
        }
        let mut chars: Vec<char> = seed_text.chars().collect();
        let strength = ctx.strength.clamp(1, 5) as usize;
        let budget = chars.len().min(strength + 1);
        let replacement_target = budget.min(strength.saturating_sub(1));
        let insertion_target = budget - replacement_target;

        let table = homoglyphs();
        let mut candidate_indices: Vec<usize> = chars
            .iter()
            .enumerate()
            .filter(|(_, c)| table.contains_key(c))
            .map(|(i, _)| i)
            .collect();
        rng.shuffle(&mut candidate_indices);

        let mut applied: Vec<Value> = Vec::new();
        for &idx in candidate_indices.iter().take(replacement_target) {
            let orig = chars[idx];
            let alt = *rng.choice(&table[&orig]);
            chars[idx] = alt;
            applied.push(json!(["homoglyph_replace", idx, format!("{orig}->{alt}")]));
        }

        for _ in 0..insertion_target {
            let zw = *rng.choice(&ZERO_WIDTH);
            let pos = rng.randrange(1, chars.len() + 1);
            chars.insert(pos, zw.chars().next().unwrap());
            applied.push(json!(["zw_insert", pos, format!("{zw:?}")]));
        }

        let child: String = chars.into_iter().collect();
        if child == seed_text {
            return ApplyResult::skipped(seed_text, "no_change");
        }
        if ctx.max_chars_exceeded(&child) {
            return ApplyResult::skipped(seed_text, "max_chars_exceeded");
        }
        let mut params = Map::new();
        params.insert("strength".to_string(), json!(strength));
        params.insert("applied".to_string(), Value::Array(applied));
        ApplyResult::ok(child, params)
    }
}

pub fn operator() -> Arc<dyn Operator> {
    Arc::new(HomoglyphInjection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_one_only_inserts_zero_width_chars() {
        let op = HomoglyphInjection;
        let ctx = Context::new("LLM01_PROMPT_INJECTION", "PROMPT_TEXT", 1);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = op.apply("hello world", &ctx, &mut rng);
        let params = &result.trace["params"];
        let applied = params["applied"].as_array().unwrap();
        assert!(applied.iter().all(|e| e[0] == "zw_insert"));
    }

    #[test]
    fn skips_on_empty_input() {
        let op = HomoglyphInjection;
        let ctx = Context::new("LLM01_PROMPT_INJECTION", "PROMPT_TEXT", 1);
        let mut rng = crate::rng::derive_rng(1, "x");
        let result = op.apply("", &ctx, &mut rng);
        assert_eq!(result.status, crate::operator::Status::Skipped);
    }
}

//! Mutates a handful of leaf values inside a tool call's argument object,
//! preserving each value's type, and occasionally swaps two sibling values.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map, Value};

use crate::operator::{ApplyResult, Context, Operator, OperatorMeta};
use crate::rng::MtRng;

const ARG_KEYS: [&str; 4] = ["arguments", "args", "params", "parameters"];

#[derive(Debug, Clone)]
enum PathSegment {
    Key(String),
    Index(usize),
}

type Path = Vec<PathSegment>;

fn collect_leaf_paths(value: &Value, prefix: &Path, out: &mut Vec<Path>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let mut p = prefix.clone();
                p.push(PathSegment::Key(k.clone()));
                collect_leaf_paths(v, &p, out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                let mut p = prefix.clone();
                p.push(PathSegment::Index(i));
                collect_leaf_paths(v, &p, out);
            }
        }
        _ => out.push(prefix.clone()),
    }
}

fn get_at<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut cur = root;
    for seg in path {
        cur = match (cur, seg) {
            (Value::Object(m), PathSegment::Key(k)) => m.get(k)?,
            (Value::Array(a), PathSegment::Index(i)) => a.get(*i)?,
            _ => return None,
        };
    }
    Some(cur)
}

fn set_at(root: &mut Value, path: &Path, new_value: Value) {
    let mut cur = root;
    for seg in &path[..path.len().saturating_sub(1)] {
        cur = match (cur, seg) {
            (Value::Object(m), PathSegment::Key(k)) => m.get_mut(k).expect("path segment must exist"),
            (Value::Array(a), PathSegment::Index(i)) => a.get_mut(*i).expect("path segment must exist"),
            _ => return,
        };
    }
    if let Some(last) = path.last() {
        match (cur, last) {
            (Value::Object(m), PathSegment::Key(k)) => {
                m.insert(k.clone(), new_value);
            }
            (Value::Array(a), PathSegment::Index(i)) => {
                if *i < a.len() {
                    a[*i] = new_value;
                }
            }
            _ => {}
        }
    }
}

fn delta_for_strength_int(strength: u8) -> i64 {
    match strength {
        1 => 1,
        2 => 2,
        3 => 5,
        4 => 10,
        _ => 100,
    }
}

fn delta_for_strength_float(strength: u8) -> f64 {
    match strength {
        1 => 0.1,
        2 => 0.25,
        3 => 0.5,
        4 => 1.0,
        _ => 10.0,
    }
}

fn mutate_value_preserve_type(v: &Value, strength: u8, rng: &mut MtRng) -> Value {
    match v {
        Value::Bool(b) => {
            if strength > 2 {
                json!(!b)
            } else {
                json!(*b)
            }
        }
        Value::Number(n) if n.is_i64() || n.is_u64() => {
            let delta = delta_for_strength_int(strength);
            let sign = if rng.chance(0.5) { 1 } else { -1 };
            json!(n.as_i64().unwrap_or(0) + sign * delta)
        }
        Value::Number(n) if n.is_f64() => {
            let delta = delta_for_strength_float(strength);
            let sign = if rng.chance(0.5) { 1.0 } else { -1.0 };
            json!(n.as_f64().unwrap_or(0.0) + sign * delta)
        }
        Value::String(s) => {
            let suffix = if strength <= 2 {
                *rng.choice(&["", "  ", " (detail)"])
            } else if strength <= 4 {
                *rng.choice(&[" (extended)", " (verbose)", " (full)"])
            } else {
                " (extended with additional padding to stress downstream parsing)"
            };
            json!(format!("{s}{suffix}"))
        }
        other => other.clone(),
    }
}

fn k_for_strength(strength: u8) -> usize {
    match strength {
        1 => 1,
        2 => 1,
        3 => 2,
        4 => 3,
        _ => 4,
    }
}

fn find_args_container(obj: &Map<String, Value>) -> Option<String> {
    ARG_KEYS
        .iter()
        .find(|k| matches!(obj.get(**k), Some(Value::Object(_)) | Some(Value::Array(_))))
        .map(|k| k.to_string())
}

pub struct ToolCallArgumentPerturbation;

impl Operator for ToolCallArgumentPerturbation {
    fn meta(&self) -> &OperatorMeta {
        static META: OnceLock<OperatorMeta> = OnceLock::new();
        META.get_or_init(|| OperatorMeta {
            op_id: "op_syn_tool_call_argument_perturbation".to_string(),
            bucket_tags: vec!["LLM08_TOOL_MISUSE".to_string(), "LLM05_OUTPUT_HANDLING".to_string()],
            surface_compat: vec!["TOOL_CALL".to_string(), "TOOL_ARGUMENTS".to_string()],
            risk_level: "HIGH".to_string(),
            strength_range: (1, 5),
            params_schema: None,
        })
    }

    fn apply(&self, seed_text: &str, ctx: &Context, rng: &mut MtRng) -> ApplyResult {
        if !["TOOL_CALL", "TOOL_ARGUMENTS"].contains(&ctx.surface.as_str()) {
            return ApplyResult::skipped(seed_text, "surface_mismatch");
        }
        if seed_text.is_empty() {
            return ApplyResult::skipped(seed_text, "empty_input");
        }
        let parsed: Value = match serde_json::from_str(seed_text) {
            Ok(v) => v,
            Err(_) => return ApplyResult::skipped(seed_text, "json_parse_failed"),
        };

        let mut root = parsed;
        let args_root_path: Path = if ctx.surface == "TOOL_ARGUMENTS" {
            vec![]
        } else {
            let Value::Object(obj) = &root else {
                return ApplyResult::skipped(seed_text, "tool_call_not_object");
            };
            match find_args_container(obj) {
                Some(key) => vec![PathSegment::Key(key)],
                None => return ApplyResult::skipped(seed_text, "no_arguments_field"),
            }
        };

        let args_value = match get_at(&root, &args_root_path) {
            Some(v) => v.clone(),
            None => return ApplyResult::skipped(seed_text, "no_arguments_field"),
        };

        let mut leaf_paths = Vec::new();
        collect_leaf_paths(&args_value, &Vec::new(), &mut leaf_paths);
        if leaf_paths.is_empty() {
            return ApplyResult::skipped(seed_text, "no_leaf_values");
        }

        let strength = ctx.strength.clamp(1, 5);
        let k = k_for_strength(strength).min(leaf_paths.len());
        rng.shuffle(&mut leaf_paths);

        let mut applied: Vec<Value> = Vec::new();
        for rel_path in leaf_paths.iter().take(k) {
            let mut full_path = args_root_path.clone();
            full_path.extend(rel_path.clone());
            if let Some(v) = get_at(&root, &full_path) {
                let mutated = mutate_value_preserve_type(v, strength, rng);
                set_at(&mut root, &full_path, mutated);
                applied.push(json!(["value_mutate", path_to_string(rel_path)]));
            }
        }

        if strength >= 3 {
            if let Some(Value::Object(args_obj)) = get_at(&root, &args_root_path) {
                let keys: Vec<String> = args_obj.keys().cloned().collect();
                if keys.len() >= 2 && rng.chance(0.35) {
                    let picked = rng.sample(&keys, 2);
                    if let [a, b] = &picked[..] {
                        let a_path = {
                            let mut p = args_root_path.clone();
                            p.push(PathSegment::Key(a.clone()));
                            p
                        };
                        let b_path = {
                            let mut p = args_root_path.clone();
                            p.push(PathSegment::Key(b.clone()));
                            p
                        };
                        let a_val = get_at(&root, &a_path).cloned();
                        let b_val = get_at(&root, &b_path).cloned();
                        if let (Some(av), Some(bv)) = (a_val, b_val) {
                            set_at(&mut root, &a_path, bv);
                            set_at(&mut root, &b_path, av);
                            applied.push(json!(["param_swap", [a, b]]));
                        }
                    }
                }
            }
        }

        let child = serde_json::to_string(&root).unwrap_or_default();
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

fn path_to_string(path: &Path) -> String {
    path.iter()
        .map(|seg| match seg {
            PathSegment::Key(k) => k.clone(),
            PathSegment::Index(i) => i.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

pub fn operator() -> Arc<dyn Operator> {
    Arc::new(ToolCallArgumentPerturbation)
}

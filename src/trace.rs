//! Mutation trace shape defaults and canonical JSON serialization.
//!
//! Traces are compared and hashed across runs, so their JSON form must be
//! stable: object keys sorted, no incidental whitespace, and the `applied`
//! triples a trace's `params` may carry sorted by `(kind, detail, index)`
//! even though the triple itself is stored as `[kind, index, detail]`.

use serde_json::{Map, Value};

/// Defaults applied to a trace object that an operator (or the registry's
/// not-found path) left incomplete.
pub fn ensure_min_trace_fields(trace: &mut Map<String, Value>) {
    trace
        .entry("op_id".to_string())
        .or_insert_with(|| Value::String("UNKNOWN_OP".to_string()));
    trace
        .entry("status".to_string())
        .or_insert_with(|| Value::String("SKIPPED".to_string()));
    trace
        .entry("params".to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    let len_before = trace
        .get("len_before")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    trace
        .entry("len_before".to_string())
        .or_insert_with(|| Value::from(len_before));
    trace
        .entry("len_after".to_string())
        .or_insert_with(|| Value::from(len_before));
}

/// Sort `trace["params"]["applied"]`, if present, by `(kind, detail, index)`.
/// Each entry is a 3-element array `[kind, index, detail]`; only the sort
/// key is reordered, the stored shape is untouched.
pub fn canonicalize_applied(trace: &mut Map<String, Value>) {
    let Some(Value::Object(params)) = trace.get_mut("params") else {
        return;
    };
    let Some(Value::Array(applied)) = params.get_mut("applied") else {
        return;
    };
    applied.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
}

fn sort_key(entry: &Value) -> (String, String, String) {
    let Value::Array(triple) = entry else {
        return (String::new(), String::new(), String::new());
    };
    let kind = triple.first().map(value_sort_text).unwrap_or_default();
    let index = triple.get(1).map(value_sort_text).unwrap_or_default();
    let detail = triple.get(2).map(value_sort_text).unwrap_or_default();
    (kind, detail, index)
}

fn value_sort_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Recursively sort object keys so two semantically-equal traces serialize
/// byte-identically.
pub fn canonicalize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for k in keys {
                sorted.insert(k.clone(), canonicalize_value(&map[k]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize_value).collect()),
        other => other.clone(),
    }
}

/// Canonical, whitespace-free JSON for a trace: sorted keys, `applied`
/// triples ordered by `(kind, detail, index)`.
pub fn canonical_json(trace: &Map<String, Value>) -> String {
    let mut trace = trace.clone();
    canonicalize_applied(&mut trace);
    serde_json::to_string(&canonicalize_value(&Value::Object(trace)))
        .expect("canonicalized trace is always valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ensure_min_trace_fields_fills_in_defaults() {
        let mut trace = Map::new();
        ensure_min_trace_fields(&mut trace);
        assert_eq!(trace["op_id"], "UNKNOWN_OP");
        assert_eq!(trace["status"], "SKIPPED");
        assert_eq!(trace["params"], json!({}));
        assert_eq!(trace["len_before"], 0);
        assert_eq!(trace["len_after"], 0);
    }

    #[test]
    fn ensure_min_trace_fields_does_not_override_present_values() {
        let mut trace = Map::new();
        trace.insert("op_id".to_string(), json!("op.x"));
        trace.insert("len_before".to_string(), json!(12));
        ensure_min_trace_fields(&mut trace);
        assert_eq!(trace["op_id"], "op.x");
        assert_eq!(trace["len_after"], 12);
    }

    #[test]
    fn canonicalize_applied_sorts_by_kind_detail_index() {
        let mut trace = Map::new();
        trace.insert(
            "params".to_string(),
            json!({
                "applied": [
                    ["zw_insert", 5, "b"],
                    ["homoglyph_replace", 2, "a->b"],
                    ["zw_insert", 1, "a"],
                ]
            }),
        );
        canonicalize_applied(&mut trace);
        let applied = trace["params"]["applied"].as_array().unwrap();
        assert_eq!(applied[0], json!(["homoglyph_replace", 2, "a->b"]));
        assert_eq!(applied[1], json!(["zw_insert", 1, "a"]));
        assert_eq!(applied[2], json!(["zw_insert", 5, "b"]));
    }

    #[test]
    fn canonical_json_has_sorted_keys_and_no_whitespace() {
        let mut trace = Map::new();
        trace.insert("status".to_string(), json!("OK"));
        trace.insert("op_id".to_string(), json!("op.a"));
        let out = canonical_json(&trace);
        assert_eq!(out, r#"{"op_id":"op.a","status":"OK"}"#);
    }
}

//! The engine-enforced output normalizer ("Policy A"): every seed and every
//! operator output passes through here before it can become part of a
//! child's text. No operator can opt out.

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Maximum character count. `0` disables truncation.
    pub max_len: usize,
    pub schema_mode: bool,
    pub placeholder: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_len: 8000,
            schema_mode: false,
            placeholder: "N/A".to_string(),
        }
    }
}

impl GuardConfig {
    /// Build a `GuardConfig` from a batch's `constraints` map, applying the
    /// same defaults the mutator's external interface documents.
    pub fn from_constraints(max_chars: Option<usize>, schema_mode: bool, placeholder: &str) -> Self {
        Self {
            max_len: max_chars.filter(|&m| m > 0).unwrap_or(8000),
            schema_mode,
            placeholder: placeholder.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GuardMeta {
    pub guard_applied: bool,
    pub removed_control_chars: bool,
    pub schema_placeholder_applied: bool,
    pub schema_placeholder_suffix_appended: bool,
    pub truncated: bool,
    pub max_len: usize,
}

fn is_forbidden_control(c: char) -> bool {
    let cp = c as u32;
    matches!(cp, 0..=8 | 11 | 12 | 14..=31 | 127)
}

fn truncate_chars(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

/// Best-effort re-application of the schema placeholder suffix after
/// truncation has clipped it off: keep as much of the prefix as the budget
/// allows, then append `"\n" + placeholder`. If even the placeholder alone
/// does not fit, emit a prefix of the placeholder.
fn reapply_schema_suffix_within_budget(truncated: &str, placeholder: &str, max_len: usize) -> String {
    let placeholder_len = placeholder.chars().count();
    if placeholder_len + 1 > max_len {
        return placeholder.chars().take(max_len).collect();
    }
    let prefix_budget = max_len - 1 - placeholder_len;
    let prefix: String = truncated.chars().take(prefix_budget).collect();
    format!("{prefix}\n{placeholder}")
}

/// Apply Policy A to `text`, returning the normalized text and the flags
/// describing what changed. Idempotent under an identical `cfg`.
pub fn guard(text: &str, cfg: &GuardConfig) -> (String, GuardMeta) {
    let mut meta = GuardMeta {
        max_len: cfg.max_len,
        ..Default::default()
    };

    let mut cleaned = String::with_capacity(text.len());
    let mut removed_any = false;
    for c in text.chars() {
        if is_forbidden_control(c) {
            removed_any = true;
        } else {
            cleaned.push(c);
        }
    }
    meta.removed_control_chars = removed_any;

    if cfg.schema_mode {
        if cleaned.is_empty() {
            cleaned = cfg.placeholder.clone();
            meta.schema_placeholder_applied = true;
        } else if !cleaned.ends_with(cfg.placeholder.as_str()) {
            cleaned = format!("{cleaned}\n{}", cfg.placeholder);
            meta.schema_placeholder_suffix_appended = true;
        }
    }

    if cfg.max_len > 0 {
        let char_count = cleaned.chars().count();
        if char_count > cfg.max_len {
            cleaned = truncate_chars(&cleaned, cfg.max_len);
            meta.truncated = true;

            if cfg.schema_mode && !cleaned.ends_with(cfg.placeholder.as_str()) {
                cleaned = reapply_schema_suffix_within_budget(&cleaned, &cfg.placeholder, cfg.max_len);
                meta.schema_placeholder_suffix_appended = true;
            }
        }
    }

    meta.guard_applied = meta.removed_control_chars
        || meta.schema_placeholder_applied
        || meta.schema_placeholder_suffix_appended
        || meta.truncated;

    (cleaned, meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_forbidden_control_chars_but_keeps_tab_lf_cr() {
        let (out, meta) = guard("HELLO\x00WORLD\x01\t\n\r!!!", &GuardConfig::default());
        assert_eq!(out, "HELLOWORLD\t\n\r!!!");
        assert!(meta.removed_control_chars);
        assert!(meta.guard_applied);
    }

    #[test]
    fn truncates_to_max_len() {
        let text = "A".repeat(200_000);
        let cfg = GuardConfig {
            max_len: 64,
            ..GuardConfig::default()
        };
        let (out, meta) = guard(&text, &cfg);
        assert_eq!(out.chars().count(), 64);
        assert!(meta.truncated);
    }

    #[test]
    fn schema_mode_on_empty_seed_yields_placeholder() {
        let cfg = GuardConfig {
            max_len: 100,
            schema_mode: true,
            placeholder: "N/A".to_string(),
        };
        let (out, meta) = guard("", &cfg);
        assert_eq!(out, "N/A");
        assert!(meta.schema_placeholder_applied);
    }

    #[test]
    fn schema_mode_appends_suffix_when_missing() {
        let cfg = GuardConfig {
            max_len: 100,
            schema_mode: true,
            placeholder: "N/A".to_string(),
        };
        let (out, _) = guard("hello", &cfg);
        assert_eq!(out, "hello\nN/A");
    }

    #[test]
    fn schema_mode_does_not_double_append_when_already_suffixed() {
        let cfg = GuardConfig {
            max_len: 100,
            schema_mode: true,
            placeholder: "N/A".to_string(),
        };
        let (out, meta) = guard("hello\nN/A", &cfg);
        assert_eq!(out, "hello\nN/A");
        assert!(!meta.schema_placeholder_suffix_appended);
    }

    #[test]
    fn schema_mode_reapplies_suffix_within_truncation_budget() {
        let cfg = GuardConfig {
            max_len: 10,
            schema_mode: true,
            placeholder: "N/A".to_string(),
        };
        let (out, meta) = guard("this is a much longer seed than the budget allows", &cfg);
        assert!(out.ends_with("N/A"));
        assert!(out.chars().count() <= 10);
        assert!(meta.truncated);
    }

    #[test]
    fn schema_mode_falls_back_to_placeholder_prefix_when_budget_too_small() {
        let cfg = GuardConfig {
            max_len: 2,
            schema_mode: true,
            placeholder: "N/A".to_string(),
        };
        let (out, _) = guard("anything", &cfg);
        assert_eq!(out, "N/");
    }

    #[test]
    fn guard_is_idempotent() {
        let cfg = GuardConfig {
            max_len: 12,
            schema_mode: true,
            placeholder: "N/A".to_string(),
        };
        let (once, _) = guard("some seed text that needs truncation", &cfg);
        let (twice, _) = guard(&once, &cfg);
        assert_eq!(once, twice);
    }

    #[test]
    fn zero_max_len_disables_truncation() {
        let cfg = GuardConfig {
            max_len: 0,
            ..GuardConfig::default()
        };
        let text = "A".repeat(10_000);
        let (out, meta) = guard(&text, &cfg);
        assert_eq!(out.len(), 10_000);
        assert!(!meta.truncated);
    }
}

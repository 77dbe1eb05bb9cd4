//! Reasoning-effort directive parsing for OpenAI-compatible models.

use regex::Regex;
use std::sync::OnceLock;

fn reasoning_model_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"(?i)codex", r"(?i)\bgpt-5", r"(?i)\bo[1-9]", r"(?i)deepseek-r1", r"(?i)qwq"]
            .iter()
            .map(|p| Regex::new(p).expect("static pattern is valid"))
            .collect()
    })
}

/// Splits a `model@effort` or `model#effort` directive. Returns the model
/// name with any directive stripped, and the normalized effort to send (if
/// any). `mini` normalizes to `minimal`. Idempotent for inputs with no
/// directive and no inferrable reasoning-model name.
pub fn resolve_model_and_effort(model: &str) -> (String, Option<String>) {
    if let Some((base, effort)) = split_directive(model) {
        return (base, Some(normalize_effort(&effort)));
    }

    if reasoning_model_patterns().iter().any(|re| re.is_match(model)) {
        return (model.to_string(), Some("medium".to_string()));
    }

    (model.to_string(), None)
}

fn split_directive(model: &str) -> Option<(String, String)> {
    let sep_index = model.rfind(['@', '#'])?;
    let (base, suffix) = model.split_at(sep_index);
    let suffix = &suffix[1..];
    if is_effort_token(suffix) {
        Some((base.to_string(), suffix.to_lowercase()))
    } else {
        None
    }
}

fn is_effort_token(token: &str) -> bool {
    matches!(
        token.to_lowercase().as_str(),
        "mini" | "minimal" | "low" | "medium" | "high"
    )
}

fn normalize_effort(effort: &str) -> String {
    match effort {
        "mini" => "minimal".to_string(),
        other => other.to_string(),
    }
}

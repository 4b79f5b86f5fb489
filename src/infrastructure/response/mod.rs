use once_cell::sync::Lazy;
use regex::Regex;

static HIDDEN_BLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<(think|thinking|reasoning|internal)>.*?</(think|thinking|reasoning|internal)>|<think\s*/>")
        .unwrap()
});

static WRAPPING_FENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*\n(.*?)\n?```$").unwrap());

static TRAILING_SPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)[ \t]+$").unwrap());

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip model scaffolding from a reply so only the analysis text is stored.
pub fn clean_llm_response(response: &str) -> String {
    let without_hidden = HIDDEN_BLOCK_PATTERN.replace_all(response, "");
    let trimmed = without_hidden.trim();

    // A reply wrapped entirely in one code fence is unwrapped.
    let unfenced = match WRAPPING_FENCE_PATTERN.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_string(),
        None => trimmed.to_string(),
    };

    let without_trailing = TRAILING_SPACE_PATTERN.replace_all(&unfenced, "");
    MULTIPLE_NEWLINES_PATTERN
        .replace_all(&without_trailing, "\n\n")
        .trim()
        .to_string()
}

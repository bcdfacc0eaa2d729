use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "contains less than 2% of:", "less than 0.5%", "less than 1/2% of"
    static ref LESS_THAN_RE: Regex = Regex::new(
        r"(?i)(?:contains\s+)?less\s+than\s+\d+(?:\.\d+)?(?:\s*/\s*\d+)?\s*%\s*(?:of\s*)?:?"
    )
    .unwrap();
    // "contains 2% or less of:"
    static ref OR_LESS_RE: Regex = Regex::new(
        r"(?i)(?:contains\s+)?\d+(?:\.\d+)?(?:\s*/\s*\d+)?\s*%\s*or\s+less\s+(?:of\s*)?:?"
    )
    .unwrap();
    static ref PREFIX_RE: Regex = Regex::new(r"(?:ingredients|made\s+from)\s*:").unwrap();
    static ref NON_WORD_RE: Regex = Regex::new(r"[^\w\s,]").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Splits a branded-food ingredient statement into a clean, ordered list.
///
/// Returns `[""]` when the input is missing or nothing survives cleaning, so the
/// column always carries a list.
pub fn format_ingredients(raw: Option<&str>) -> Vec<String> {
    let raw = match raw {
        Some(r) => r,
        None => return vec![String::new()],
    };

    let text = LESS_THAN_RE.replace_all(raw, "");
    let text = OR_LESS_RE.replace_all(&text, "");
    let text = text.to_lowercase();
    let text = PREFIX_RE.replace_all(&text, "");
    let text = text.replace('(', ",");
    let text = NON_WORD_RE.replace_all(&text, "");
    let text = WHITESPACE_RE.replace_all(&text, " ");

    let items: Vec<String> = text
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        vec![String::new()]
    } else {
        items
    }
}

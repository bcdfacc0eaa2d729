use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NAME_STRIP_RE: Regex = Regex::new(r"[^a-z0-9_]").unwrap();
    static ref VALUE_STRIP_RE: Regex = Regex::new(r"[,()]").unwrap();
}

/// Turns a raw header such as `"Total lipid (fat)"` into a column name such as
/// `"total_lipid_fat"`.
///
/// Whitespace runs become a single underscore, everything is lowercased and any
/// character outside `[a-z0-9_]` is dropped. Leading and trailing underscores are
/// trimmed, so formatting an already formatted name returns it unchanged.
pub fn format_name(name: &str) -> String {
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");
    let lowered = joined.to_lowercase();
    NAME_STRIP_RE
        .replace_all(&lowered, "")
        .trim_matches('_')
        .to_string()
}

pub fn format_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names.iter().map(|n| format_name(n.as_ref())).collect()
}

/// Cleans a free-text cell (category, brand, description): commas and
/// parentheses are removed and the result is lowercased.
pub fn format_value(value: &str) -> String {
    VALUE_STRIP_RE.replace_all(value, "").to_lowercase()
}

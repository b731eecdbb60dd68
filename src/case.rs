//! Identifier inflection for envelope keys: model name -> singular/plural lower-camel keys.

use regex::Regex;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"))
}

/// True for plain column/model identifiers (letters, digits, underscore; not starting with a digit).
pub fn is_identifier(s: &str) -> bool {
    identifier_re().is_match(s)
}

/// Lower the first character, keep the rest.
/// e.g. "Post" -> "post", "BlogPost" -> "blogPost", "user_id" -> "user_id"
pub fn to_lower_camel(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Naive English plural. Handles the common suffix rules only.
/// e.g. "post" -> "posts", "category" -> "categories", "box" -> "boxes", "key" -> "keys"
pub fn pluralize(s: &str) -> String {
    let lower = s.to_lowercase();
    if lower.ends_with('y') && !ends_with_vowel_y(&lower) {
        return format!("{}ies", &s[..s.len() - 1]);
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        return format!("{}es", s);
    }
    format!("{}s", s)
}

fn ends_with_vowel_y(lower: &str) -> bool {
    let mut rev = lower.chars().rev();
    rev.next();
    matches!(rev.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}

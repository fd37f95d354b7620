//! Turning free text like "the red door" into (attr, name)

use std::sync::OnceLock;

use regex::Regex;

/// Words ignored when naming or looking up a vessel.
pub const ARTICLES: [&str; 8] = ["into", "some", "the", "a", "an", "one", "to", "in"];

/// Words that make a message read as a question.
pub const QUESTION_WORDS: [&str; 10] = [
    "are", "is", "does", "who", "what", "where", "when", "how", "why", "which",
];

fn article_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(&format!("(?i)^(?:{})$", ARTICLES.join("|"))).ok())
        .as_ref()
}

fn is_article(word: &str) -> bool {
    article_pattern().is_some_and(|re| re.is_match(word))
}

/// Strip articles and prepositions, keeping the final word even if it is one.
pub fn clean_vessel_name(value: &str) -> String {
    let words: Vec<&str> = value.split_whitespace().collect();
    let Some((last, rest)) = words.split_last() else {
        return String::new();
    };
    let mut kept: Vec<&str> = rest.iter().copied().filter(|w| !is_article(w)).collect();
    kept.push(last);
    kept.join(" ")
}

/// Split cleaned text into `(attr, name)`; the name is the last word.
pub fn split_vessel_name(value: &str) -> (String, String) {
    let cleaned = clean_vessel_name(value);
    match cleaned.rsplit_once(' ') {
        Some((attr, name)) => (attr.trim().to_string(), name.to_string()),
        None => (String::new(), cleaned),
    }
}

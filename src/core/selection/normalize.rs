/// Characters stripped from selections before lookup
const HTML_METACHARACTERS: [char; 5] = ['<', '>', '&', '"', '\''];

/// Normalize selected text into a lookup key.
///
/// Strips HTML metacharacters, lower-cases, and collapses whitespace runs
/// into single spaces with no leading or trailing space. Idempotent.
pub fn normalize_term(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !HTML_METACHARACTERS.contains(c))
        .collect::<String>()
        .to_lowercase();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

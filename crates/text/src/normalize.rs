use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Letters kept by [`normalize`]: basic latin plus the Slovak/Czech diacritics
pub const ALPHABET_LETTERS: &str = "abcdefghijklmnopqrstuvwxyzáäčďéěíľĺňóôřšťúůýž";

/// `http…` and `www.…` tokens up to the next whitespace
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"http\S+|www\.\S+").expect("valid url regex"));

/// Whitespace-delimited tokens containing an `@`
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+").expect("valid email regex"));

/// Anything that is not an alphabet letter, an ASCII digit or whitespace
static DISALLOWED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"[^{}0-9\s]", ALPHABET_LETTERS)).expect("valid alphabet regex")
});

/// Normalize a search query into its canonical form
///
/// Steps run in a fixed order, each relying on the previous one:
/// 1. lowercase (Unicode aware, diacritics survive)
/// 2. drop URL tokens
/// 3. drop e-mail tokens
/// 4. replace characters outside the alphabet, digits and whitespace with a space
/// 5. collapse whitespace runs and trim
///
/// The result may be empty, which means the query carried nothing searchable.
pub fn normalize(text: &str) -> String {
    let text = text.to_lowercase();
    let text = URL_RE.replace_all(&text, "");
    let text = EMAIL_RE.replace_all(&text, "");
    let text = DISALLOWED_RE.replace_all(&text, " ");

    let canonical = text.split_whitespace().collect::<Vec<_>>().join(" ");

    debug!("Normalized query: {} chars -> {} chars", text.chars().count(), canonical.chars().count());

    canonical
}

/// Whether a query still has searchable content after normalization
pub fn is_meaningful(text: &str) -> bool {
    !normalize(text).is_empty()
}

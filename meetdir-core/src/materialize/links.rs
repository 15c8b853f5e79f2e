//! One-hop link discovery inside fetched documents.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s<>()\[\]{}"'`|]+"#).expect("valid URL pattern"))
}

/// URLs in `text` that start with one of `prefixes`, in order of first
/// appearance, without duplicates or anything in `known`.
pub fn extract_links(text: &str, prefixes: &[String], known: &HashSet<&str>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();

    url_re()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']))
        .filter(|url| prefixes.iter().any(|p| url.starts_with(p.as_str())))
        .filter(|url| !known.contains(url))
        .filter(|url| seen.insert(*url))
        .take(limit)
        .map(str::to_string)
        .collect()
}

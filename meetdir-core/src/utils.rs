//! Small string helpers shared across modules.

const MAX_SLUG_LEN: usize = 50;
const MAX_FILENAME_LEN: usize = 100;

/// Lowercase, dash-separated, ASCII slug capped at 50 characters.
pub fn slugify(s: &str) -> String {
    let slug: String = slug::slugify(s).chars().take(MAX_SLUG_LEN).collect();
    slug.trim_end_matches('-').to_string()
}

/// Replace characters that are unsafe in file names, keeping the title readable.
pub fn safe_filename(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    let trimmed: String = collapsed
        .trim_matches(|c: char| c == '-' || c.is_whitespace())
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect();

    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        "document".to_string()
    } else {
        trimmed
    }
}

/// Normalize a title for comparison: lowercase, single spaces, no colons,
/// slashes turned into dashes.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace('/', "-")
        .replace(':', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Team Standup"), "team-standup");
        assert_eq!(slugify("Meeting: Q4 Review!"), "meeting-q4-review");
        assert_eq!(slugify("  Lots   of   spaces  "), "lots-of-spaces");
    }

    #[test]
    fn test_slugify_truncates_long_titles() {
        let long_title = "a".repeat(100);
        assert_eq!(slugify(&long_title).len(), 50);
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("Q1 Plan: draft/v2"), "Q1 Plan- draft-v2");
        assert_eq!(safe_filename("***"), "document");
        assert_eq!(safe_filename(".."), "document");
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Team   Sync: Weekly/All "), "team sync weekly-all");
    }
}

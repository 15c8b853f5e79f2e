//! Keyword suggestions for meetings without a cached pattern.

use serde::Serialize;

use crate::record::{ClassificationSource, MeetingRecord};

pub const ONE_ON_ONES_TAG: &str = "one-on-ones";
pub const TEAM_TAG: &str = "team";
pub const PLANNING_TAG: &str = "planning";
pub const UNCATEGORIZED_TAG: &str = "uncategorized";

/// Tags every suggestion can produce, with a description.
pub const DEFAULT_TAGS: [(&str, &str); 4] = [
    (ONE_ON_ONES_TAG, "Recurring one-on-one conversations"),
    (TEAM_TAG, "Team rituals: standups, all-hands, onboarding"),
    (PLANNING_TAG, "Planning, sprint and retro sessions"),
    (UNCATEGORIZED_TAG, "Not yet sorted"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub tag: String,
    pub recurring: bool,
    pub source: ClassificationSource,
}

impl Suggestion {
    pub fn new(tag: &str, recurring: bool, source: ClassificationSource) -> Self {
        Suggestion {
            tag: tag.to_string(),
            recurring,
            source,
        }
    }
}

/// Title keyword rules, first match wins.
struct Rule {
    keywords: &'static [&'static str],
    tag: Option<&'static str>,
    recurring: bool,
}

const RULES: &[Rule] = &[
    Rule {
        keywords: &["standup", "stand-up", "daily"],
        tag: Some(TEAM_TAG),
        recurring: true,
    },
    Rule {
        keywords: &["weekly", "bi-weekly", "biweekly"],
        tag: None,
        recurring: true,
    },
    Rule {
        keywords: &["sync", "check-in", "checkin"],
        tag: None,
        recurring: true,
    },
    Rule {
        keywords: &["planning", "sprint", "retro"],
        tag: Some(PLANNING_TAG),
        recurring: true,
    },
    Rule {
        keywords: &["interview", "onboarding"],
        tag: Some(TEAM_TAG),
        recurring: false,
    },
    Rule {
        keywords: &["all-hands", "all hands", "town hall"],
        tag: Some(TEAM_TAG),
        recurring: true,
    },
];

/// Heuristic suggestion, or the uncategorized one-off fallback.
pub fn heuristic(record: &MeetingRecord) -> Suggestion {
    if record.flags.one_on_one {
        return Suggestion::new(ONE_ON_ONES_TAG, true, ClassificationSource::Heuristic);
    }

    let title = record.title.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| title.contains(kw)))
        .map(|rule| {
            Suggestion::new(
                rule.tag.unwrap_or(UNCATEGORIZED_TAG),
                rule.recurring,
                ClassificationSource::Heuristic,
            )
        })
        .unwrap_or_else(|| Suggestion::new(UNCATEGORIZED_TAG, false, ClassificationSource::Fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::make_record;

    fn suggest(title: &str) -> Suggestion {
        heuristic(&make_record("evt1", title))
    }

    #[test]
    fn test_keyword_rules() {
        assert_eq!(
            suggest("Daily Standup"),
            Suggestion::new(TEAM_TAG, true, ClassificationSource::Heuristic)
        );
        assert_eq!(
            suggest("Sprint Planning"),
            Suggestion::new(PLANNING_TAG, true, ClassificationSource::Heuristic)
        );
        assert_eq!(
            suggest("Interview: Backend"),
            Suggestion::new(TEAM_TAG, false, ClassificationSource::Heuristic)
        );
        assert_eq!(
            suggest("Platform Weekly"),
            Suggestion::new(UNCATEGORIZED_TAG, true, ClassificationSource::Heuristic)
        );
    }

    #[test]
    fn test_one_on_one_wins_over_keywords() {
        let mut record = make_record("evt1", "Weekly sync");
        record.flags.one_on_one = true;
        assert_eq!(
            heuristic(&record),
            Suggestion::new(ONE_ON_ONES_TAG, true, ClassificationSource::Heuristic)
        );
    }

    #[test]
    fn test_fallback() {
        assert_eq!(
            suggest("Acme kickoff"),
            Suggestion::new(UNCATEGORIZED_TAG, false, ClassificationSource::Fallback)
        );
    }
}

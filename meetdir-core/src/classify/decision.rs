//! Inline decision syntax: `N=TAG,r|o[,SLUG]`.
//!
//! `N` is the 1-based position in the pending list, `r` marks the meeting
//! recurring and `o` one-off. Example: `2=team,r` or `5=customers,o,acme-kickoff`.

use crate::classify::{ClassifyUpdate, PendingItem};

/// Decisions that parsed, plus `(argument, reason)` for those that did not.
#[derive(Debug, Default)]
pub struct ParsedDecisions {
    pub updates: Vec<ClassifyUpdate>,
    pub invalid: Vec<(String, String)>,
}

pub fn parse_decisions<S: AsRef<str>>(args: &[S], pending: &[PendingItem]) -> ParsedDecisions {
    let mut parsed = ParsedDecisions::default();

    for arg in args {
        let arg = arg.as_ref();
        match parse_one(arg, pending) {
            Ok(update) => parsed.updates.push(update),
            Err(reason) => parsed.invalid.push((arg.to_string(), reason)),
        }
    }

    parsed
}

fn parse_one(arg: &str, pending: &[PendingItem]) -> Result<ClassifyUpdate, String> {
    let (number, decision) = arg
        .split_once('=')
        .ok_or_else(|| "expected N=TAG,r|o".to_string())?;

    let number: usize = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid meeting number '{}'", number.trim()))?;
    let item = pending
        .iter()
        .find(|p| p.number == number)
        .ok_or_else(|| format!("no pending meeting #{}", number))?;

    let parts: Vec<&str> = decision.split(',').map(str::trim).collect();
    let (tag, kind, slug) = match parts.as_slice() {
        [tag, kind] => (*tag, *kind, None),
        [tag, kind, slug] => (*tag, *kind, Some(slug.to_string())),
        _ => return Err("expected TAG,r|o".to_string()),
    };

    if tag.is_empty() {
        return Err("missing tag".to_string());
    }
    let recurring = match kind.to_lowercase().as_str() {
        "r" => true,
        "o" => false,
        other => return Err(format!("expected 'r' or 'o', got '{}'", other)),
    };

    Ok(ClassifyUpdate {
        stable_id: item.record.stable_id.clone(),
        tag: tag.to_string(),
        recurring,
        slug: slug.filter(|s| !s.is_empty()),
    })
}

//! Slugs for new meeting records.

use crate::record::Attendee;
use crate::utils::slugify;

const ONE_ON_ONE_MARKERS: [&str; 3] = ["1:1", "1-1", "one on one"];

/// A title marker or exactly two attendees.
pub fn is_one_on_one(title: &str, attendees: &[Attendee]) -> bool {
    let title = title.to_lowercase();
    ONE_ON_ONE_MARKERS.iter().any(|m| title.contains(m)) || attendees.len() == 2
}

/// Slug and one-on-one flag for a meeting.
///
/// One-on-ones are named after the other person's email local part so every
/// occurrence lands in the same series directory regardless of title
/// changes. Everything else is named after the title.
pub fn generate_slug(title: &str, attendees: &[Attendee], user_email: Option<&str>) -> (String, bool) {
    let title_slug = || {
        let slug = slugify(title);
        if slug.is_empty() { "meeting".to_string() } else { slug }
    };

    if !is_one_on_one(title, attendees) {
        return (title_slug(), false);
    }

    let user = user_email.map(str::to_lowercase);
    let other = attendees
        .iter()
        .find(|a| Some(a.email.to_lowercase()) != user);

    let slug = other
        .and_then(|a| {
            let local = a.email.split('@').next().unwrap_or_default();
            let slug = slugify(local);
            if !slug.is_empty() {
                return Some(slug);
            }
            a.name.as_deref().map(slugify).filter(|s| !s.is_empty())
        })
        .unwrap_or_else(title_slug);

    (slug, true)
}

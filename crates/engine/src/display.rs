use std::collections::HashMap;

use tunewatch_common::types::ContributorRef;

/// Name used when nothing at all is known about the contributor.
pub const UNKNOWN_CONTRIBUTOR: &str = "Someone";

/// Resolves the name shown in notifications.
///
/// Precedence: configured override (by contributor id) > catalog display name
/// > contributor id > [`UNKNOWN_CONTRIBUTOR`].
#[derive(Debug, Clone, Default)]
pub struct DisplayNames {
    overrides: HashMap<String, String>,
}

impl DisplayNames {
    pub fn new(overrides: HashMap<String, String>) -> Self {
        Self { overrides }
    }

    pub fn resolve(&self, contributor: Option<&ContributorRef>) -> String {
        let Some(contributor) = contributor else {
            return UNKNOWN_CONTRIBUTOR.to_string();
        };

        self.overrides
            .get(&contributor.id)
            .map(String::as_str)
            .or(contributor.display_name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .or(Some(contributor.id.as_str()).filter(|id| !id.is_empty()))
            .unwrap_or(UNKNOWN_CONTRIBUTOR)
            .to_string()
    }

    /// Notification text for one added item. Mentions only who added it.
    pub fn message(&self, contributor: Option<&ContributorRef>) -> String {
        format!(
            "🎵 {} added a new track to the playlist!",
            self.resolve(contributor)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> DisplayNames {
        DisplayNames::new(HashMap::from([("u1".to_string(), "Alice".to_string())]))
    }

    #[test]
    fn test_override_wins() {
        let c = ContributorRef::new("u1", Some("alice_1987"));
        assert_eq!(names().resolve(Some(&c)), "Alice");
    }

    #[test]
    fn test_display_name_then_id() {
        let c = ContributorRef::new("u2", Some("Bobby"));
        assert_eq!(names().resolve(Some(&c)), "Bobby");

        let c = ContributorRef::new("u3", None);
        assert_eq!(names().resolve(Some(&c)), "u3");
    }

    #[test]
    fn test_placeholder_when_unknown() {
        assert_eq!(names().resolve(None), UNKNOWN_CONTRIBUTOR);
        let c = ContributorRef::new("", None);
        assert_eq!(names().resolve(Some(&c)), UNKNOWN_CONTRIBUTOR);
    }

    #[test]
    fn test_message_has_only_the_name() {
        let c = ContributorRef::new("u1", None);
        assert_eq!(
            names().message(Some(&c)),
            "🎵 Alice added a new track to the playlist!"
        );
    }
}

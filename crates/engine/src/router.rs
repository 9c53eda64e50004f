//! Recipient router: decides who hears about an addition.
//!
//! Two people share a playlist and want to know when the *other* one adds
//! something, so a contributor that maps to a default party is routed to the
//! counterpart. Anything the router can't attribute goes to both parties.
//!
//! Configured rules are consulted first. Failing those, the parties
//! themselves act as rules: a contributor whose id equals a party's recipient
//! id, or whose display name matches a party's name, is that party.

use std::collections::HashMap;

use tunewatch_common::types::{ContributorRef, Party, PartyConfig, RecipientId, RoutingTarget};

pub struct RecipientRouter {
    party_a: RecipientId,
    party_b: RecipientId,
    rules: HashMap<String, RoutingTarget>,
    /// Every rule again under its lower-cased key, for display-name lookups.
    folded: HashMap<String, RoutingTarget>,
    /// Party recipient ids and lower-cased party names.
    implicit: HashMap<String, Party>,
}

impl RecipientRouter {
    pub fn new(
        party_a: &PartyConfig,
        party_b: &PartyConfig,
        rules: HashMap<String, RoutingTarget>,
    ) -> Self {
        let mut implicit = HashMap::new();
        // B first so A wins if both parties share a key
        for (party, config) in [(Party::B, party_b), (Party::A, party_a)] {
            implicit.insert(config.recipient.to_string(), party);
            if let Some(name) = &config.name {
                implicit.insert(name.to_lowercase(), party);
            }
        }

        // keys already written in lower case win over case variants of them
        let mut folded = HashMap::new();
        let (lower, mut mixed): (Vec<_>, Vec<_>) = rules
            .iter()
            .partition(|(key, _)| key.to_lowercase() == **key);
        mixed.sort_by(|a, b| a.0.cmp(b.0));
        for (key, target) in lower.into_iter().chain(mixed) {
            folded
                .entry(key.to_lowercase())
                .or_insert_with(|| target.clone());
        }

        Self {
            party_a: party_a.recipient.clone(),
            party_b: party_b.recipient.clone(),
            rules,
            folded,
            implicit,
        }
    }

    /// Resolve the recipients for an item added by `contributor`.
    ///
    /// Never empty. Recipients are distinct and ordered A before B.
    pub fn resolve(&self, contributor: Option<&ContributorRef>) -> Vec<RecipientId> {
        let Some(contributor) = contributor else {
            return self.defaults();
        };

        if let Some(target) = self.rule_for(contributor) {
            return match target {
                RoutingTarget::Counterpart(party) => vec![self.recipient(party.counterpart())],
                RoutingTarget::Explicit(id) => match self.party_of(id) {
                    Some(party) => vec![self.recipient(party.counterpart())],
                    None => vec![id.clone()],
                },
            };
        }

        match self.implicit_party(contributor) {
            Some(party) => vec![self.recipient(party.counterpart())],
            None => self.defaults(),
        }
    }

    /// First matching rule for: id, lower-cased display name, raw display name.
    fn rule_for(&self, contributor: &ContributorRef) -> Option<&RoutingTarget> {
        if let Some(target) = self.rules.get(&contributor.id) {
            return Some(target);
        }
        let name = contributor.display_name.as_deref()?;
        self.folded
            .get(&name.to_lowercase())
            .or_else(|| self.rules.get(name))
    }

    fn implicit_party(&self, contributor: &ContributorRef) -> Option<Party> {
        if let Some(party) = self.implicit.get(&contributor.id) {
            return Some(*party);
        }
        let name = contributor.display_name.as_deref()?;
        self.implicit.get(&name.to_lowercase()).copied()
    }

    fn party_of(&self, id: &RecipientId) -> Option<Party> {
        if *id == self.party_a {
            Some(Party::A)
        } else if *id == self.party_b {
            Some(Party::B)
        } else {
            None
        }
    }

    fn recipient(&self, party: Party) -> RecipientId {
        match party {
            Party::A => self.party_a.clone(),
            Party::B => self.party_b.clone(),
        }
    }

    fn defaults(&self) -> Vec<RecipientId> {
        if self.party_a == self.party_b {
            vec![self.party_a.clone()]
        } else {
            vec![self.party_a.clone(), self.party_b.clone()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party(id: &str) -> PartyConfig {
        PartyConfig {
            recipient: RecipientId::new(id),
            name: None,
        }
    }

    fn named(id: &str, name: &str) -> PartyConfig {
        PartyConfig {
            recipient: RecipientId::new(id),
            name: Some(name.to_string()),
        }
    }

    fn router(rules: &[(&str, &str)]) -> RecipientRouter {
        let rules = rules
            .iter()
            .map(|(k, v)| (k.to_string(), RoutingTarget::parse(v).unwrap()))
            .collect();
        RecipientRouter::new(&party("111"), &party("222"), rules)
    }

    fn ids(recipients: Vec<RecipientId>) -> Vec<String> {
        recipients.into_iter().map(|r| r.as_str().to_string()).collect()
    }

    #[test]
    fn test_unattributed_goes_to_everyone() {
        assert_eq!(ids(router(&[]).resolve(None)), vec!["111", "222"]);
    }

    #[test]
    fn test_unknown_contributor_goes_to_everyone() {
        let r = router(&[("alice", "A")]);
        let stranger = ContributorRef::new("zed", Some("Zed"));
        assert_eq!(ids(r.resolve(Some(&stranger))), vec!["111", "222"]);
    }

    #[test]
    fn test_party_letter_routes_to_counterpart() {
        let r = router(&[("alice", "A"), ("bob", "B")]);
        assert_eq!(ids(r.resolve(Some(&ContributorRef::new("alice", None)))), vec!["222"]);
        assert_eq!(ids(r.resolve(Some(&ContributorRef::new("bob", None)))), vec!["111"]);
    }

    #[test]
    fn test_name_rule_matches_regardless_of_case() {
        let r = router(&[("Bob", "B"), ("ALICE", "-100")]);

        let shouting = ContributorRef::new("sp_bob", Some("BOB"));
        assert_eq!(ids(r.resolve(Some(&shouting))), vec!["111"]);

        let lower = ContributorRef::new("sp_bob", Some("bob"));
        assert_eq!(ids(r.resolve(Some(&lower))), vec!["111"]);

        let mixed = ContributorRef::new("sp_alice", Some("Alice"));
        assert_eq!(ids(r.resolve(Some(&mixed))), vec!["-100"]);
    }

    #[test]
    fn test_explicit_party_id_routes_to_counterpart() {
        let r = router(&[("alice", "111")]);
        assert_eq!(ids(r.resolve(Some(&ContributorRef::new("alice", None)))), vec!["222"]);
    }

    #[test]
    fn test_explicit_other_id_overrides_defaults() {
        let r = router(&[("carol", "-100999")]);
        assert_eq!(
            ids(r.resolve(Some(&ContributorRef::new("carol", None)))),
            vec!["-100999"]
        );
    }

    #[test]
    fn test_lookup_order_id_then_lowercase_then_raw_name() {
        let r = router(&[("u1", "A"), ("alice", "B"), ("Bob", "A")]);

        // id wins over display name
        let by_id = ContributorRef::new("u1", Some("Alice"));
        assert_eq!(ids(r.resolve(Some(&by_id))), vec!["222"]);

        // lower-cased display name
        let by_lower = ContributorRef::new("u2", Some("ALICE"));
        assert_eq!(ids(r.resolve(Some(&by_lower))), vec!["111"]);

        // raw display name when no lower-cased key exists
        let by_raw = ContributorRef::new("u3", Some("Bob"));
        assert_eq!(ids(r.resolve(Some(&by_raw))), vec!["222"]);
    }

    #[test]
    fn test_never_notifies_the_adder() {
        let r = router(&[("a", "A"), ("b", "B"), ("a2", "111"), ("b2", "222")]);
        for (who, own) in [("a", "111"), ("b", "222"), ("a2", "111"), ("b2", "222")] {
            let resolved = ids(r.resolve(Some(&ContributorRef::new(who, None))));
            assert!(!resolved.is_empty());
            assert!(!resolved.contains(&own.to_string()), "{} notified itself", who);
        }
    }

    #[test]
    fn test_parties_are_implicit_rules() {
        let r = RecipientRouter::new(
            &named("111", "Party1"),
            &named("222", "Party2"),
            HashMap::new(),
        );

        let by_name = ContributorRef::new("spotify_xyz", Some("party1"));
        assert_eq!(ids(r.resolve(Some(&by_name))), vec!["222"]);

        let by_id = ContributorRef::new("222", None);
        assert_eq!(ids(r.resolve(Some(&by_id))), vec!["111"]);
    }

    #[test]
    fn test_configured_rule_beats_implicit_party() {
        let rules = HashMap::from([(
            "party1".to_string(),
            RoutingTarget::parse("-100").unwrap(),
        )]);
        let r = RecipientRouter::new(&named("111", "Party1"), &named("222", "Party2"), rules);

        let c = ContributorRef::new("spotify_xyz", Some("Party1"));
        assert_eq!(ids(r.resolve(Some(&c))), vec!["-100"]);
    }

    #[test]
    fn test_identical_parties_deduplicated() {
        let r = RecipientRouter::new(&party("111"), &party("111"), HashMap::new());
        assert_eq!(ids(r.resolve(None)), vec!["111"]);
    }
}

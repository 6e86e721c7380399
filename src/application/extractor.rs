//! Roster extraction from merged event sequences.
//!
//! Pure, order-independent deduplication: participants and mentions key on
//! the case-folded identifier (first occurrence wins, no field merging);
//! channels key on the exact string.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::domain::{Event, EntityKind, Participant, Roster};

/// Author identifiers carrying this prefix belong to broadcast channels
/// and are not counted as participants.
const CHANNEL_AUTHOR_PREFIX: &str = "channel";

/// Extracts deduplicated participants, mentions and channels from events.
pub struct RosterExtractor {
    mention_re: Regex,
}

impl Default for RosterExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterExtractor {
    /// Creates an extractor with the compiled mention pattern.
    pub fn new() -> Self {
        Self {
            // A handle is `@` followed by ASCII letters, digits or underscores.
            mention_re: Regex::new(r"@([A-Za-z0-9_]+)").unwrap(),
        }
    }

    /// Extracts a roster from an ordered event sequence.
    ///
    /// Total over well-formed input; an empty sequence yields an empty
    /// roster. Output collections are unordered.
    pub fn extract(&self, events: &[Event]) -> Roster {
        let mut participants: HashMap<String, Participant> = HashMap::new();
        let mut mentions: HashMap<String, Participant> = HashMap::new();
        let mut channels: HashSet<String> = HashSet::new();

        for event in events {
            if !event.author_id.is_empty() && !event.author_id.starts_with(CHANNEL_AUTHOR_PREFIX) {
                let key = event.author_id.to_lowercase();
                participants.entry(key).or_insert_with(|| Participant {
                    id: event.author_id.clone(),
                    username: derive_username(&event.author_id),
                    ..Default::default()
                });
            }

            for handle in self.text_mentions(&event.text) {
                let key = handle.to_lowercase();
                mentions.entry(key).or_insert_with(|| Participant {
                    id: handle.clone(),
                    username: handle.clone(),
                    ..Default::default()
                });
            }

            for entity in &event.entities {
                match entity.kind {
                    EntityKind::Mention => {
                        let handle = entity.text.trim_start_matches('@');
                        if !handle.is_empty() {
                            let key = handle.to_lowercase();
                            mentions.entry(key).or_insert_with(|| Participant {
                                id: handle.to_string(),
                                username: handle.to_string(),
                                ..Default::default()
                            });
                        }
                    }
                    // Channel identity is exact-match, unlike people.
                    EntityKind::Channel => {
                        channels.insert(entity.text.clone());
                    }
                    EntityKind::Other => {}
                }
            }
        }

        Roster {
            participants: filter_people(participants),
            mentions: filter_people(mentions),
            channels: channels.into_iter().collect(),
        }
    }

    /// Handles referenced in free text, deduplicated within this one text
    /// in first-seen order. Stored without the leading `@`.
    fn text_mentions(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for capture in self.mention_re.captures_iter(text) {
            let handle = &capture[1];
            if seen.insert(handle.to_string()) {
                result.push(handle.to_string());
            }
        }
        result
    }
}

/// Flattens per-file event batches into one merged sequence, preserving
/// order within and across batches.
pub fn merge_events(batches: Vec<Vec<Event>>) -> Vec<Event> {
    batches.into_iter().flatten().collect()
}

/// Derives a display username from an author identifier.
///
/// Leading `@` is stripped; purely numeric identifiers (channel/group style
/// ids) get no username at all; anything else passes through.
fn derive_username(id: &str) -> String {
    if let Some(stripped) = id.strip_prefix('@') {
        return stripped.to_string();
    }
    if is_numeric(id) {
        return String::new();
    }
    id.to_string()
}

/// Numeric-identifier check, minus sign allowed when the string leads with
/// one. Intentionally accepts a `-` at any position in that case; the
/// looser check is observable behavior and is kept as-is.
fn is_numeric(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let leads_with_minus = s.starts_with('-');
    s.chars()
        .all(|c| c.is_ascii_digit() || (c == '-' && leads_with_minus))
}

/// Drops deleted records and records with nothing displayable.
fn filter_people(map: HashMap<String, Participant>) -> Vec<Participant> {
    map.into_values()
        .filter(|p| !p.is_deleted && p.has_display_text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Entity;

    fn extract(events: &[Event]) -> Roster {
        RosterExtractor::new().extract(events)
    }

    fn usernames(people: &[Participant]) -> std::collections::HashSet<String> {
        people.iter().map(|p| p.username.clone()).collect()
    }

    #[test]
    fn test_empty_input_yields_empty_roster() {
        let roster = extract(&[]);
        assert!(roster.is_empty());
    }

    #[test]
    fn test_participants_dedup_case_insensitively_first_wins() {
        let events = vec![
            Event::new("@Alice", "hi"),
            Event::new("@alice", "hi again"),
            Event::new("@ALICE", "hi once more"),
        ];
        let roster = extract(&events);

        assert_eq!(roster.participants.len(), 1);
        // First occurrence's data wins.
        assert_eq!(roster.participants[0].id, "@Alice");
        assert_eq!(roster.participants[0].username, "Alice");
    }

    #[test]
    fn test_channel_prefixed_author_is_skipped() {
        let events = vec![Event::new("channel123", "broadcast")];
        let roster = extract(&events);
        assert!(roster.participants.is_empty());
    }

    #[test]
    fn test_empty_author_still_contributes_mentions() {
        let events = vec![Event::new("", "ping @bob")];
        let roster = extract(&events);
        assert!(roster.participants.is_empty());
        assert_eq!(usernames(&roster.mentions), ["bob".to_string()].into());
    }

    #[test]
    fn test_numeric_ids_get_no_username_and_are_filtered() {
        // Numeric authors have no displayable text, so they dedup but
        // never surface in the result.
        let events = vec![Event::new("123456", "x"), Event::new("-100200300", "y")];
        let roster = extract(&events);
        assert!(roster.participants.is_empty());
    }

    #[test]
    fn test_is_numeric_quirks() {
        assert!(is_numeric("123"));
        assert!(is_numeric("-123"));
        // Looser check: extra minus signs pass when the first char is '-'.
        assert!(is_numeric("-1-2"));
        assert!(!is_numeric("1-2"));
        assert!(!is_numeric(""));
        assert!(!is_numeric("12a"));
    }

    #[test]
    fn test_bare_at_is_not_a_mention() {
        let events = vec![Event::new("u1", "hello @ world @bob")];
        let roster = extract(&events);
        assert_eq!(usernames(&roster.mentions), ["bob".to_string()].into());
    }

    #[test]
    fn test_text_mentions_dedup_within_event_and_across_events() {
        let events = vec![
            Event::new("u1", "@bob @bob @Carol"),
            Event::new("u2", "@BOB again"),
        ];
        let roster = extract(&events);

        // First occurrence wins across the whole input.
        let mentions = usernames(&roster.mentions);
        assert_eq!(mentions, ["bob".to_string(), "Carol".to_string()].into());
    }

    #[test]
    fn test_entity_mentions_strip_at_and_merge_with_text_mentions() {
        let mut event = Event::new("u1", "");
        event.entities.push(Entity::new(EntityKind::Mention, "@dave"));
        event.entities.push(Entity::new(EntityKind::Mention, "@"));
        let events = vec![event, Event::new("u2", "@Dave")];

        let roster = extract(&events);
        assert_eq!(usernames(&roster.mentions), ["dave".to_string()].into());
    }

    #[test]
    fn test_channels_dedup_by_exact_match() {
        let mut a = Event::new("u1", "");
        a.entities.push(Entity::new(EntityKind::Channel, "@News"));
        a.entities.push(Entity::new(EntityKind::Channel, "@news"));
        let mut b = Event::new("u2", "");
        b.entities.push(Entity::new(EntityKind::Channel, "@News"));

        let roster = extract(&[a, b]);
        let channels: std::collections::HashSet<_> = roster.channels.iter().cloned().collect();
        assert_eq!(
            channels,
            ["@News".to_string(), "@news".to_string()].into()
        );
    }

    #[test]
    fn test_mentions_are_distinct_from_participants() {
        let events = vec![Event::new("@alice", "talking to @alice")];
        let roster = extract(&events);
        assert_eq!(roster.participants.len(), 1);
        assert_eq!(roster.mentions.len(), 1);
    }

    #[test]
    fn test_other_entities_are_ignored() {
        let mut event = Event::new("u1", "");
        event.entities.push(Entity::new(EntityKind::Other, "#tag"));
        let roster = extract(&[event]);
        assert!(roster.mentions.is_empty());
        assert!(roster.channels.is_empty());
    }

    #[test]
    fn test_merge_events_preserves_order() {
        let merged = merge_events(vec![
            vec![Event::new("a", "1"), Event::new("b", "2")],
            vec![Event::new("c", "3")],
        ]);
        let authors: Vec<_> = merged.iter().map(|e| e.author_id.as_str()).collect();
        assert_eq!(authors, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_two_file_merge_yields_union() {
        let file_a: Vec<Event> = (0..10).map(|i| Event::new(format!("@a{i}"), "")).collect();
        let file_b: Vec<Event> = (0..45).map(|i| Event::new(format!("@b{i}"), "")).collect();

        let merged = merge_events(vec![file_a, file_b]);
        let roster = extract(&merged);
        assert_eq!(roster.participants.len(), 55);
    }
}
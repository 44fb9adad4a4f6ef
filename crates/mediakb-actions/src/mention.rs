//! Resolves which object the user is talking about.

use serde_json::Value;

use mediakb_core::slots::{SLOT_LAST_OBJECT, SLOT_LAST_OBJECT_TYPE, SLOT_LISTED_OBJECTS, SLOT_MENTION, SLOT_OBJECT_TYPE};
use mediakb_core::types::display_value;

use crate::tracker::Tracker;

/// Picks an item of the last listed objects for an ordinal mention:
/// `"1"` to `"10"`, `"LAST"`, and `"ANY"` which takes the first item.
pub fn ordinal(mention: &str, listed: &[String]) -> Option<String> {
    let index = match mention {
        "ANY" => 0,
        "LAST" => listed.len().checked_sub(1)?,
        n => match n.parse::<usize>() {
            Ok(i @ 1..=10) => i - 1,
            _ => return None,
        },
    };
    listed.get(index).cloned()
}

fn is_ordinal(mention: &str) -> bool {
    matches!(mention, "ANY" | "LAST") || mention.parse::<usize>().is_ok()
}

fn listed_objects(tracker: &Tracker) -> Vec<String> {
    match tracker.get_slot(SLOT_LISTED_OBJECTS) {
        Some(Value::Array(items)) => items.iter().filter_map(display_value).collect(),
        _ => Vec::new(),
    }
}

/// Object named by the `mention` slot, or `None` without a usable mention.
pub fn resolve_mention(tracker: &Tracker) -> Option<String> {
    let mention = tracker.slot_text(SLOT_MENTION)?;
    let listed = listed_objects(tracker);
    if !listed.is_empty() && is_ordinal(&mention) {
        // an ordinal past the end of the list names nothing
        return ordinal(&mention, &listed);
    }
    // only the last object can be referred to by a non-ordinal mention
    let same_type = tracker.slot_text(SLOT_OBJECT_TYPE) == tracker.slot_text(SLOT_LAST_OBJECT_TYPE);
    if same_type {
        tracker.slot_text(SLOT_LAST_OBJECT)
    } else {
        None
    }
}

/// Key of the object of interest: the mention if any, else the slot named
/// after the object type, else the last object when allowed.
pub fn object_name(tracker: &Tracker, use_last_object_mention: bool) -> Option<String> {
    if tracker.slot_text(SLOT_MENTION).is_some() {
        return resolve_mention(tracker);
    }
    if let Some(name) = tracker.slot_text(SLOT_OBJECT_TYPE).and_then(|t| tracker.slot_text(&t)) {
        return Some(name);
    }
    if use_last_object_mention {
        tracker.slot_text(SLOT_LAST_OBJECT)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listed() -> Vec<String> {
        ["a", "b", "c"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ordinals_index_the_listed_objects() {
        assert_eq!(ordinal("1", &listed()).as_deref(), Some("a"));
        assert_eq!(ordinal("3", &listed()).as_deref(), Some("c"));
        assert_eq!(ordinal("LAST", &listed()).as_deref(), Some("c"));
        assert_eq!(ordinal("ANY", &listed()).as_deref(), Some("a"));
        assert_eq!(ordinal("4", &listed()), None);
        assert_eq!(ordinal("11", &listed()), None);
        assert_eq!(ordinal("0", &listed()), None);
        assert_eq!(ordinal("LAST", &[]), None);
    }

    #[test]
    fn numeric_ids_in_listed_objects_are_accepted() {
        let t = Tracker::default()
            .with_slot(SLOT_MENTION, "2")
            .with_slot(SLOT_LISTED_OBJECTS, json!([843, 986]));
        assert_eq!(resolve_mention(&t).as_deref(), Some("986"));
    }

    #[test]
    fn ordinal_past_the_list_does_not_fall_back_to_last_object() {
        let t = Tracker::default()
            .with_slot(SLOT_MENTION, "5")
            .with_slot(SLOT_OBJECT_TYPE, "book")
            .with_slot(SLOT_LAST_OBJECT_TYPE, "book")
            .with_slot(SLOT_LAST_OBJECT, "843")
            .with_slot(SLOT_LISTED_OBJECTS, json!(["843", "986", "1001"]));
        assert_eq!(resolve_mention(&t), None);
        assert_eq!(object_name(&t, true), None);
        assert_eq!(object_name(&t.with_slot(SLOT_MENTION, "LAST"), true).as_deref(), Some("1001"));
    }

    #[test]
    fn plain_mention_refers_to_last_object_of_same_type() {
        let t = Tracker::default()
            .with_slot(SLOT_MENTION, "it")
            .with_slot(SLOT_OBJECT_TYPE, "book")
            .with_slot(SLOT_LAST_OBJECT_TYPE, "book")
            .with_slot(SLOT_LAST_OBJECT, "843");
        assert_eq!(object_name(&t, false).as_deref(), Some("843"));
        let other = t.with_slot(SLOT_OBJECT_TYPE, "movie");
        assert_eq!(object_name(&other, true), None);
    }

    #[test]
    fn falls_back_to_type_slot_then_last_object() {
        let t = Tracker::default()
            .with_slot(SLOT_OBJECT_TYPE, "book")
            .with_slot(SLOT_LAST_OBJECT, "843");
        assert_eq!(object_name(&t, true).as_deref(), Some("843"));
        assert_eq!(object_name(&t, false), None);
        let named = t.with_slot("book", "986");
        assert_eq!(object_name(&named, true).as_deref(), Some("986"));
    }
}

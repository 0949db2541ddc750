//! Global timeline reconstruction.
//!
//! # Responsibility
//! - Replay every card's lifecycle (created, edits, deleted) into typed
//!   events, expanding todo changes with the todo differ.
//! - Apply the optional inclusive time window and order the result.
//!
//! # Invariants
//! - Pure function of the supplied cards and window; no I/O.
//! - Event ids are fresh per call; everything else is reproducible.
//! - Ordering is `event_time DESC`. Ties keep emission order: cards in the
//!   order supplied, then per card `card_created`, `card_deleted`, and each
//!   history entry in insertion order (title, added, removed, modified).
//! - The delete event is stamped with `updated_at`, the only delete time the
//!   card document keeps.

use crate::diff::todo_diff::{diff_todos, TodoModification};
use crate::model::card::{Card, TodoItem};
use crate::model::history::HistoryEntry;
use crate::model::timeline::{TimeWindow, TimelineEvent, TimelineEventType};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Ordered timeline plus its event count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub events: Vec<TimelineEvent>,
    pub total: usize,
}

/// Rebuilds the merged, time-ordered event stream for `cards`.
pub fn build_timeline(cards: &[Card], window: &TimeWindow) -> Timeline {
    let mut events: Vec<TimelineEvent> = cards
        .iter()
        .flat_map(replay_card)
        .filter(|event| window.contains(event.event_time))
        .collect();

    // Stable: equal timestamps keep emission order.
    events.sort_by(|a, b| b.event_time.cmp(&a.event_time));

    let total = events.len();
    Timeline { events, total }
}

/// Emits every event of one card's lifecycle, unsorted.
pub fn replay_card(card: &Card) -> Vec<TimelineEvent> {
    let emitter = CardEmitter { card };
    let mut events = vec![emitter.event(
        TimelineEventType::CardCreated,
        card.created_at,
        format!("Created \"{}\"", card.title),
        None,
    )];

    if card.is_deleted {
        events.push(emitter.event(
            TimelineEventType::CardDeleted,
            card.updated_at,
            format!("Deleted \"{}\"", card.title),
            None,
        ));
    }

    for entry in &card.history {
        emitter.replay_entry(entry, &mut events);
    }
    events
}

struct CardEmitter<'a> {
    card: &'a Card,
}

impl CardEmitter<'_> {
    fn replay_entry(&self, entry: &HistoryEntry, events: &mut Vec<TimelineEvent>) {
        let at = entry.edit_time;

        if let Some(title) = entry.change_set.title.as_ref() {
            events.push(self.event(
                TimelineEventType::TitleChanged,
                at,
                format!("Title changed: \"{}\" → \"{}\"", title.old, title.new),
                Some(details([
                    ("old_title", Value::from(title.old.as_str())),
                    ("new_title", Value::from(title.new.as_str())),
                ])),
            ));
        }

        let Some(todos) = entry.change_set.todos.as_ref() else {
            return;
        };
        let diff = diff_todos(&todos.old, &todos.new);
        for item in diff.added {
            events.push(self.todo_event(TimelineEventType::TodoAdded, at, "added", item));
        }
        for item in diff.removed {
            events.push(self.todo_event(TimelineEventType::TodoRemoved, at, "removed", item));
        }
        for modification in &diff.modified {
            events.push(self.todo_modified_event(at, modification));
        }
    }

    fn todo_event(
        &self,
        event_type: TimelineEventType,
        at: i64,
        verb: &str,
        item: &TodoItem,
    ) -> TimelineEvent {
        self.event(
            event_type,
            at,
            format!("\"{}\" {} todo: {}", self.card.title, verb, item.text),
            Some(details([
                ("todo_id", Value::from(item.todo_id.as_str())),
                ("todo_text", Value::from(item.text.as_str())),
            ])),
        )
    }

    fn todo_modified_event(&self, at: i64, modification: &TodoModification<'_>) -> TimelineEvent {
        let changes: Vec<String> = modification
            .changed_fields
            .iter()
            .map(|change| format!("{}: {}", change.field.as_str(), change.transition))
            .collect();
        self.event(
            TimelineEventType::TodoModified,
            at,
            format!(
                "\"{}\" updated todo: {} ({})",
                self.card.title,
                modification.new.text,
                changes.join(", ")
            ),
            Some(details([
                ("todo_id", Value::from(modification.new.todo_id.as_str())),
                ("todo_text", Value::from(modification.new.text.as_str())),
                ("old_todo_text", Value::from(modification.old.text.as_str())),
                ("changes", Value::from(changes)),
            ])),
        )
    }

    fn event(
        &self,
        event_type: TimelineEventType,
        event_time: i64,
        description: String,
        details: Option<Map<String, Value>>,
    ) -> TimelineEvent {
        TimelineEvent {
            event_id: Uuid::new_v4().to_string(),
            event_type,
            card_id: self.card.id,
            card_title: self.card.title.clone(),
            event_time,
            description,
            details,
        }
    }
}

fn details<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{build_timeline, replay_card};
    use crate::model::card::{Card, TodoItem};
    use crate::model::history::{ChangeSet, FieldChange, HistoryEntry};
    use crate::model::timeline::{TimeWindow, TimelineEventType};

    fn card_at(title: &str, created_at: i64) -> Card {
        Card::new(title, "body", None, created_at)
    }

    fn entry(edit_time: i64, change_set: ChangeSet) -> HistoryEntry {
        HistoryEntry {
            history_id: format!("h-{edit_time}"),
            edit_time,
            operator: "anonymous".to_string(),
            change_set,
            note: None,
        }
    }

    fn types(card: &Card) -> Vec<TimelineEventType> {
        replay_card(card).iter().map(|event| event.event_type).collect()
    }

    #[test]
    fn replays_created_title_and_deleted() {
        let mut card = card_at("Renamed", 100);
        card.history.push(entry(
            200,
            ChangeSet {
                title: Some(FieldChange::new("Draft".to_string(), "Renamed".to_string())),
                ..ChangeSet::default()
            },
        ));
        card.is_deleted = true;
        card.updated_at = 300;

        let timeline = build_timeline(&[card], &TimeWindow::default());
        assert_eq!(timeline.total, 3);
        let summary: Vec<_> = timeline
            .events
            .iter()
            .map(|event| (event.event_type, event.event_time))
            .collect();
        assert_eq!(
            summary,
            vec![
                (TimelineEventType::CardDeleted, 300),
                (TimelineEventType::TitleChanged, 200),
                (TimelineEventType::CardCreated, 100),
            ]
        );
        let title_event = &timeline.events[1];
        assert_eq!(title_event.description, "Title changed: \"Draft\" → \"Renamed\"");
        let details = title_event.details.as_ref().unwrap();
        assert_eq!(details["old_title"], "Draft");
        assert_eq!(details["new_title"], "Renamed");
    }

    #[test]
    fn content_and_style_only_edits_emit_nothing() {
        let mut card = card_at("Quiet", 1);
        card.history.push(entry(
            2,
            ChangeSet {
                content: Some(FieldChange::new("a".to_string(), "b".to_string())),
                ..ChangeSet::default()
            },
        ));
        assert_eq!(types(&card), vec![TimelineEventType::CardCreated]);
    }

    #[test]
    fn todo_changes_expand_to_one_event_per_item_sharing_edit_time() {
        let mut card = card_at("Groceries", 1);
        let old = vec![TodoItem::new("a", "milk", 1), TodoItem::new("b", "eggs", 1)];
        let mut new = vec![TodoItem::new("a", "oat milk", 1), TodoItem::new("c", "bread", 5)];
        new[0].completed = true;
        card.history.push(entry(
            5,
            ChangeSet {
                todos: Some(FieldChange::new(old, new)),
                ..ChangeSet::default()
            },
        ));

        let events = replay_card(&card);
        let todo_events: Vec<_> = events.iter().filter(|event| event.event_time == 5).collect();
        assert_eq!(
            todo_events
                .iter()
                .map(|event| event.event_type)
                .collect::<Vec<_>>(),
            vec![
                TimelineEventType::TodoAdded,
                TimelineEventType::TodoRemoved,
                TimelineEventType::TodoModified,
            ]
        );
        let modified = todo_events[2];
        assert_eq!(
            modified.description,
            "\"Groceries\" updated todo: oat milk (text: \"milk\" → \"oat milk\", completed: open → done)"
        );
        let details = modified.details.as_ref().unwrap();
        assert_eq!(details["old_todo_text"], "milk");
        assert_eq!(details["changes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn window_is_inclusive_and_ties_keep_card_order() {
        let first = card_at("First", 10);
        let second = card_at("Second", 10);
        let third = card_at("Third", 20);

        let timeline = build_timeline(
            &[first.clone(), second.clone(), third],
            &TimeWindow::new(Some(10), Some(10)),
        );
        assert_eq!(timeline.total, 2);
        assert_eq!(timeline.events[0].card_id, first.id);
        assert_eq!(timeline.events[1].card_id, second.id);
    }

    #[test]
    fn inverted_window_yields_empty_timeline() {
        let timeline = build_timeline(&[card_at("Any", 10)], &TimeWindow::new(Some(20), Some(5)));
        assert_eq!(timeline.total, 0);
        assert!(timeline.events.is_empty());
    }
}

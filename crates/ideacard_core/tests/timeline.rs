mod common;

use common::{create_request, todo, unchanged_edit, TestClock};
use ideacard_core::db::open_db_in_memory;
use ideacard_core::{
    CardService, CardServiceError, ServiceLimits, SqliteCardStore, TimeWindow, TimelineEvent,
    TimelineEventType,
};

const T0: i64 = 1_700_000_000_000;
const T1: i64 = T0 + 60_000;
const T2: i64 = T0 + 120_000;

fn summary(events: &[TimelineEvent]) -> Vec<(TimelineEventType, String, i64, String)> {
    events
        .iter()
        .map(|event| {
            (
                event.event_type,
                event.card_id.to_string(),
                event.event_time,
                event.description.clone(),
            )
        })
        .collect()
}

#[test]
fn created_edited_deleted_card_yields_three_events_newest_first() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = TestClock::at(T0);
    let mut service =
        CardService::with_clock(SqliteCardStore::try_new(&mut conn).unwrap(), clock.clone());

    let card = service.create_card(create_request("Draft")).unwrap();
    let id = card.id.to_string();
    clock.set(T1);
    let mut request = unchanged_edit(&card);
    request.title = "Final".to_string();
    service.edit_card(&id, request).unwrap();
    clock.set(T2);
    service.soft_delete(&id).unwrap();

    let timeline = service.get_timeline(&TimeWindow::default()).unwrap();
    assert_eq!(timeline.total, 3);
    assert_eq!(timeline.events.len(), 3);
    let kinds: Vec<_> = timeline
        .events
        .iter()
        .map(|event| (event.event_type, event.event_time))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (TimelineEventType::CardDeleted, T2),
            (TimelineEventType::TitleChanged, T1),
            (TimelineEventType::CardCreated, T0),
        ]
    );
    assert!(timeline.events.iter().all(|event| event.card_id == card.id));
    assert!(timeline.events.iter().all(|event| event.card_title == "Final"));
}

#[test]
fn single_instant_window_returns_only_the_title_change() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = TestClock::at(T0);
    let mut service =
        CardService::with_clock(SqliteCardStore::try_new(&mut conn).unwrap(), clock.clone());

    let card = service.create_card(create_request("Draft")).unwrap();
    let id = card.id.to_string();
    clock.set(T1);
    let mut request = unchanged_edit(&card);
    request.title = "Final".to_string();
    service.edit_card(&id, request).unwrap();
    clock.set(T2);
    service.soft_delete(&id).unwrap();

    let timeline = service
        .get_timeline(&TimeWindow::new(Some(T1), Some(T1)))
        .unwrap();
    assert_eq!(timeline.total, 1);
    let event = &timeline.events[0];
    assert_eq!(event.event_type, TimelineEventType::TitleChanged);
    assert_eq!(event.event_time, T1);
    let details = event.details.as_ref().unwrap();
    assert_eq!(details["old_title"], "Draft");
    assert_eq!(details["new_title"], "Final");

    let open_start = service
        .get_timeline(&TimeWindow::new(Some(T1), None))
        .unwrap();
    assert_eq!(open_start.total, 2);
    let open_end = service
        .get_timeline(&TimeWindow::new(None, Some(T1)))
        .unwrap();
    assert_eq!(open_end.total, 2);
}

#[test]
fn todo_edits_expand_into_item_events_at_the_edit_time() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = TestClock::at(T0);
    let mut service =
        CardService::with_clock(SqliteCardStore::try_new(&mut conn).unwrap(), clock.clone());

    let card = service.create_card(create_request("Errands")).unwrap();
    let id = card.id.to_string();

    clock.set(T1);
    let mut request = unchanged_edit(&card);
    request.todos = vec![todo("a", "x", false)];
    let card = service.edit_card(&id, request).unwrap();

    clock.set(T2);
    let mut request = unchanged_edit(&card);
    request.todos = vec![todo("a", "x", true), todo("b", "y", false)];
    service.edit_card(&id, request).unwrap();

    let timeline = service
        .get_timeline(&TimeWindow::new(Some(T2), None))
        .unwrap();
    let kinds: Vec<_> = timeline
        .events
        .iter()
        .map(|event| event.event_type)
        .collect();
    assert_eq!(
        kinds,
        vec![TimelineEventType::TodoAdded, TimelineEventType::TodoModified]
    );
    assert!(timeline.events.iter().all(|event| event.event_time == T2));
    let added = timeline.events[0].details.as_ref().unwrap();
    assert_eq!(added["todo_id"], "b");

    let all = service.get_timeline(&TimeWindow::default()).unwrap();
    assert_eq!(all.total, 4);
    assert_eq!(all.events[2].event_type, TimelineEventType::TodoAdded);
    assert_eq!(all.events[2].event_time, T1);
}

#[test]
fn removed_todos_emit_events_and_content_edits_do_not() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = TestClock::at(T0);
    let mut service =
        CardService::with_clock(SqliteCardStore::try_new(&mut conn).unwrap(), clock.clone());

    let card = service.create_card(create_request("Shrink")).unwrap();
    let id = card.id.to_string();
    clock.set(T1);
    let mut request = unchanged_edit(&card);
    request.todos = vec![todo("a", "one", false), todo("b", "two", false)];
    let card = service.edit_card(&id, request).unwrap();

    clock.set(T2);
    let mut request = unchanged_edit(&card);
    request.todos = vec![todo("b", "two", false)];
    request.content = "content only changes emit nothing".to_string();
    service.edit_card(&id, request).unwrap();

    let timeline = service
        .get_timeline(&TimeWindow::new(Some(T2), Some(T2)))
        .unwrap();
    assert_eq!(timeline.total, 1);
    assert_eq!(timeline.events[0].event_type, TimelineEventType::TodoRemoved);
    assert_eq!(timeline.events[0].description, "\"Shrink\" removed todo: one");
}

#[test]
fn timeline_merges_cards_and_includes_deleted_ones() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = TestClock::at(T0);
    let mut service =
        CardService::with_clock(SqliteCardStore::try_new(&mut conn).unwrap(), clock.clone());

    let first = service.create_card(create_request("First")).unwrap();
    clock.set(T1);
    let second = service.create_card(create_request("Second")).unwrap();
    clock.set(T2);
    service.soft_delete(&first.id.to_string()).unwrap();

    let timeline = service.get_timeline(&TimeWindow::default()).unwrap();
    let ordered: Vec<_> = timeline
        .events
        .iter()
        .map(|event| (event.card_id, event.event_type))
        .collect();
    assert_eq!(
        ordered,
        vec![
            (first.id, TimelineEventType::CardDeleted),
            (second.id, TimelineEventType::CardCreated),
            (first.id, TimelineEventType::CardCreated),
        ]
    );

    let times: Vec<_> = timeline.events.iter().map(|event| event.event_time).collect();
    let mut sorted = times.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(times, sorted);
}

#[test]
fn reconstruction_is_reproducible_apart_from_event_ids() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = TestClock::at(T0);
    let mut service =
        CardService::with_clock(SqliteCardStore::try_new(&mut conn).unwrap(), clock.clone());

    let card = service.create_card(create_request("Stable")).unwrap();
    clock.set(T1);
    let mut request = unchanged_edit(&card);
    request.title = "Stable 2".to_string();
    request.todos = vec![todo("a", "x", false), todo("b", "y", false)];
    service.edit_card(&card.id.to_string(), request).unwrap();

    let first = service.get_timeline(&TimeWindow::default()).unwrap();
    let second = service.get_timeline(&TimeWindow::default()).unwrap();
    assert_eq!(summary(&first.events), summary(&second.events));
    assert_ne!(first.events[0].event_id, second.events[0].event_id);
}

#[test]
fn iso_bounds_are_parsed_and_garbage_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = TestClock::at(1_704_067_200_000);
    let mut service =
        CardService::with_clock(SqliteCardStore::try_new(&mut conn).unwrap(), clock.clone());
    service.create_card(create_request("New year")).unwrap();

    let hit = service
        .get_timeline_iso(Some("2024-01-01T00:00:00Z"), Some("2024-01-01T00:00:00Z"))
        .unwrap();
    assert_eq!(hit.total, 1);

    let miss = service
        .get_timeline_iso(Some("2024-01-02T00:00:00"), None)
        .unwrap();
    assert_eq!(miss.total, 0);

    let err = service.get_timeline_iso(Some("soon"), None).unwrap_err();
    assert!(matches!(err, CardServiceError::Validation(_)));
}

#[test]
fn timeline_scan_respects_configured_cap() {
    let mut conn = open_db_in_memory().unwrap();
    let clock = TestClock::at(T0);
    let mut service =
        CardService::with_clock(SqliteCardStore::try_new(&mut conn).unwrap(), clock.clone())
            .with_limits(ServiceLimits {
                list_limit: 2,
                timeline_scan_limit: 1,
            });

    for offset in 0..3 {
        clock.set(T0 + offset);
        service.create_card(create_request("capped")).unwrap();
    }

    assert_eq!(service.list_active().unwrap().total, 2);
    let timeline = service.get_timeline(&TimeWindow::default()).unwrap();
    assert_eq!(timeline.total, 1);
    assert_eq!(timeline.events[0].event_time, T0 + 2);
}

mod common;

use common::{seeded, session, stored_numeric, Account, Ghost, Number};
use trystore_core::{ResultError, TryQueryExt, TrySessionExt};

fn message_children(err: &ResultError) -> Vec<String> {
    err.children()
        .iter()
        .filter_map(|child| match child {
            ResultError::Message(message) => Some(message.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn save_persists_added_records() {
    let mut session = session();
    session.add_range(common::numbers(10)).unwrap();

    session.try_save_changes().unwrap();

    assert!(!session.has_changes());
    assert_eq!(session.query::<Number>().try_count().unwrap(), 10);
}

#[test]
fn save_without_pending_changes_succeeds() {
    let mut session = seeded(3);
    session.try_save_changes().unwrap();
    assert_eq!(session.query::<Number>().try_count().unwrap(), 3);
}

#[test]
fn successive_updates_use_accepted_values_as_originals() {
    let mut session = seeded(1);

    let mut number = session.try_find::<Number>(&1).unwrap().unwrap();
    number.numeric = 10;
    session.update(number.clone());
    session.try_save_changes().unwrap();

    number.numeric = 20;
    session.update(number);
    session.try_save_changes().unwrap();

    assert_eq!(stored_numeric(&session, 1), 20);
}

#[test]
fn removed_records_are_deleted() {
    let mut session = seeded(3);

    let doomed = session.try_find::<Number>(&2).unwrap().unwrap();
    session.remove(&doomed);
    session.try_save_changes().unwrap();

    let ids = session
        .query::<Number>()
        .try_to_list()
        .unwrap()
        .into_iter()
        .map(|number| number.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn concurrency_conflict_lists_each_record_with_values() {
    let mut session = seeded(2);

    let loaded = session.query::<Number>().try_to_list().unwrap();
    session
        .connection()
        .execute("UPDATE numbers SET numeric = numeric + 100;", [])
        .unwrap();
    for mut number in loaded {
        number.numeric *= 10;
        session.update(number);
    }

    let err = session.try_save_changes().unwrap_err();

    let ResultError::Composite { label, children } = &err else {
        panic!("expected composite error, got {err:?}");
    };
    assert_eq!(label, "Concurrency conflicts");
    assert!(matches!(children.last(), Some(ResultError::Fault { .. })));

    let lines = message_children(&err);
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "Concurrency conflict for 'Number'. Original value : '{id: 1, numeric: 1}'. New value : '{id: 1, numeric: 10}'"
    );
    assert!(lines[1].contains("Original value : '{id: 2, numeric: 2}'"));
    assert!(lines[1].contains("New value : '{id: 2, numeric: 20}'"));

    assert!(session.has_changes());
    assert_eq!(stored_numeric(&session, 1), 101);
    assert_eq!(stored_numeric(&session, 2), 102);
}

#[test]
fn updating_a_vanished_record_is_a_conflict() {
    let mut session = seeded(1);
    session
        .connection()
        .execute("DELETE FROM numbers WHERE id = 1;", [])
        .unwrap();

    session.update(Number { id: 1, numeric: 7 });
    let err = session.try_save_changes().unwrap_err();

    let lines = message_children(&err);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("Original value : '<not loaded>'"));
}

#[test]
fn uniqueness_violation_names_type_without_values() {
    let mut session = session();
    session.add(Account::new("taken@example.com")).unwrap();
    session.try_save_changes().unwrap();

    session.add(Account::new("taken@example.com")).unwrap();
    session.add(Account::new("taken@example.com")).unwrap();
    let err = session.try_save_changes().unwrap_err();

    let ResultError::Composite { label, children } = &err else {
        panic!("expected composite error, got {err:?}");
    };
    assert_eq!(label, "Save errors");

    let lines = message_children(&err);
    assert_eq!(lines, vec!["Save errors for 'Account'"; 2]);
    assert!(lines.iter().all(|line| !line.contains("taken@example.com")));

    let native = children.last().unwrap();
    assert!(native.error_string().contains("UNIQUE constraint failed"));

    assert_eq!(session.query::<Account>().try_count().unwrap(), 1);
}

#[test]
fn duplicate_primary_key_is_an_update_fault() {
    let mut session = seeded(1);
    session.add(Number::new(1)).unwrap();

    let err = session.try_save_changes().unwrap_err();
    assert_eq!(message_children(&err), vec!["Save errors for 'Number'"]);
}

#[test]
fn failed_flush_rolls_back_successful_writes() {
    let mut session = seeded(1);
    session.add(Number::new(2)).unwrap();
    session.add(Number::new(1)).unwrap();

    assert!(session.try_save_changes().is_err());
    session.clear_tracking();
    assert_eq!(session.query::<Number>().try_count().unwrap(), 1);
}

#[test]
fn unclassified_failures_are_wrapped_with_context() {
    let mut session = session();
    session.add(Ghost { id: 1 }).unwrap();

    let err = session.try_save_changes().unwrap_err();
    let text = err.error_string();
    assert!(
        text.starts_with("Failed to try_save_changes on 'Session'"),
        "{text}"
    );
    assert!(text.contains("no such table"), "{text}");
}

#[test]
fn error_structure_serializes_for_reporting() {
    let mut session = seeded(1);
    session.add(Number::new(1)).unwrap();
    let err = session.try_save_changes().unwrap_err();

    let json = serde_json::to_value(err.error_structure()).unwrap();
    assert_eq!(json["message"], "Save errors");
    assert_eq!(json["children"][0]["message"], "Save errors for 'Number'");
    assert_eq!(json["children"][1]["kind"], "StoreError");
}

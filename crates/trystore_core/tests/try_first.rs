mod common;

use common::{seeded, session, Ghost, Number, ERROR_MESSAGE};
use trystore_core::{Filter, TryQueryExt};

#[test]
fn strict_first_returns_lowest_key() {
    let session = seeded(10);

    let first = session.query::<Number>().try_first_or(ERROR_MESSAGE).unwrap();
    assert_eq!(first, Number::new(1));
}

#[test]
fn strict_first_on_empty_fails_with_message_verbatim() {
    let session = session();

    let err = session
        .query::<Number>()
        .try_first_or(ERROR_MESSAGE)
        .unwrap_err();
    assert_eq!(err.error_string(), ERROR_MESSAGE);
}

#[test]
fn strict_first_with_predicate() {
    let session = seeded(10);

    let found = session
        .query::<Number>()
        .filter(Filter::gt("numeric", 4_i64))
        .try_first_or(ERROR_MESSAGE)
        .unwrap();
    assert_eq!(found, Number::new(5));

    let err = session
        .query::<Number>()
        .filter(Filter::gt("numeric", 40_i64))
        .try_first_or(ERROR_MESSAGE)
        .unwrap_err();
    assert_eq!(err.error_string(), ERROR_MESSAGE);
}

#[test]
fn lenient_first_distinguishes_found_and_absent() {
    let empty = session();
    assert_eq!(empty.query::<Number>().try_first().unwrap(), None);

    let session = seeded(10);
    let query = session.query::<Number>();
    assert_eq!(query.try_first().unwrap(), Some(Number::new(1)));
    assert_eq!(
        query.try_first_where(Filter::eq("id", 1_i64)).unwrap(),
        Some(Number::new(1))
    );
    assert_eq!(query.try_first_where(Filter::eq("id", 99_i64)).unwrap(), None);
}

#[test]
fn engine_failure_is_wrapped_with_operation_and_type() {
    let session = session();

    let err = session.query::<Ghost>().try_first().unwrap_err();
    let text = err.error_string();
    assert!(text.contains("Failed to try_first on 'Ghost'"), "{text}");
    assert!(text.contains("no such table"), "{text}");
}

#[test]
fn strict_first_where_combines_predicate_and_message() {
    let session = seeded(10);
    let query = session.query::<Number>();

    let found = query
        .try_first_where_or(Filter::ge("numeric", 7_i64), ERROR_MESSAGE)
        .unwrap();
    assert_eq!(found, Number::new(7));

    let err = query
        .try_first_where_or(Filter::eq("id", 77_i64), ERROR_MESSAGE)
        .unwrap_err();
    assert_eq!(err.error_string(), ERROR_MESSAGE);
}

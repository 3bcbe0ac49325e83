mod common;

use common::{session, Number, ERROR_MESSAGE};
use trystore_core::{Filter, OptionOutcomeExt, TryQueryExt, TrySessionExt};

#[test]
fn ten_sequential_records_end_to_end() {
    let mut session = session();
    session.add_range(common::numbers(10)).unwrap();
    session.try_save_changes().unwrap();

    let query = session.query::<Number>();
    assert_eq!(query.try_count().unwrap(), 10);
    assert_eq!(query.try_first_or(ERROR_MESSAGE).unwrap(), Number::new(1));
    assert!(query.try_single_or(ERROR_MESSAGE).is_err());

    let by_key = query
        .try_single_where(Filter::key::<Number>(&1))
        .collapse(ERROR_MESSAGE)
        .unwrap();
    assert_eq!(by_key, Number::new(1));
}

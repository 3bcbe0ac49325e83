#![allow(dead_code)]

use rusqlite::types::{Type, Value};
use rusqlite::Row;
use trystore_core::{Entity, Migration, Session, SessionOptions};
use uuid::Uuid;

pub const ERROR_MESSAGE: &str = "Error Message";

pub const MIGRATIONS: &[Migration] = &[
    Migration::new(
        1,
        "CREATE TABLE numbers (
            id INTEGER PRIMARY KEY,
            numeric INTEGER NOT NULL
        );",
    ),
    Migration::new(
        2,
        "CREATE TABLE accounts (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE
        );
        CREATE TABLE pairs (
            a_id INTEGER NOT NULL,
            b_id INTEGER NOT NULL,
            note TEXT,
            PRIMARY KEY (a_id, b_id)
        );",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Number {
    pub id: i64,
    pub numeric: i64,
}

impl Number {
    pub fn new(id: i64) -> Self {
        Self { id, numeric: id }
    }
}

impl Entity for Number {
    type Key = i64;
    const TYPE_NAME: &'static str = "Number";
    const TABLE: &'static str = "numbers";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["numeric"];

    fn key(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Integer(self.numeric)]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            numeric: row.get("numeric")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
}

impl Account {
    pub fn new(email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
        }
    }
}

impl Entity for Account {
    type Key = Uuid;
    const TYPE_NAME: &'static str = "Account";
    const TABLE: &'static str = "accounts";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["email"];

    fn key(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Text(self.email.clone())]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let id_text: String = row.get("id")?;
        let id = Uuid::parse_str(&id_text)
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(err)))?;
        Ok(Self {
            id,
            email: row.get("email")?,
        })
    }
}

/// Maps a table with a two-column primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub a_id: i64,
    pub b_id: i64,
}

impl Entity for Pair {
    type Key = i64;
    const TYPE_NAME: &'static str = "Pair";
    const TABLE: &'static str = "pairs";
    const KEY_COLUMN: &'static str = "a_id";
    const COLUMNS: &'static [&'static str] = &["b_id"];

    fn key(&self) -> i64 {
        self.a_id
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Integer(self.b_id)]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            a_id: row.get("a_id")?,
            b_id: row.get("b_id")?,
        })
    }
}

/// Reads `numbers` with a text key, which the table does not declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextKeyedNumber {
    pub id: String,
    pub numeric: i64,
}

impl Entity for TextKeyedNumber {
    type Key = String;
    const TYPE_NAME: &'static str = "TextKeyedNumber";
    const TABLE: &'static str = "numbers";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["numeric"];

    fn key(&self) -> String {
        self.id.clone()
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Integer(self.numeric)]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            numeric: row.get("numeric")?,
        })
    }
}

/// Reads `numbers` under a key column name the table does not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MisnamedKeyNumber {
    pub number_id: i64,
    pub numeric: i64,
}

impl Entity for MisnamedKeyNumber {
    type Key = i64;
    const TYPE_NAME: &'static str = "MisnamedKeyNumber";
    const TABLE: &'static str = "numbers";
    const KEY_COLUMN: &'static str = "number_id";
    const COLUMNS: &'static [&'static str] = &["numeric"];

    fn key(&self) -> i64 {
        self.number_id
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Integer(self.numeric)]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            number_id: row.get("number_id")?,
            numeric: row.get("numeric")?,
        })
    }
}

/// Entity whose table is never created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ghost {
    pub id: i64,
}

impl Entity for Ghost {
    type Key = i64;
    const TYPE_NAME: &'static str = "Ghost";
    const TABLE: &'static str = "ghosts";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[];

    fn key(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        Vec::new()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { id: row.get("id")? })
    }
}

pub fn session() -> Session {
    session_with(SessionOptions::default())
}

pub fn session_with(options: SessionOptions) -> Session {
    Session::open_in_memory(options, MIGRATIONS).unwrap()
}

pub fn numbers(count: i64) -> Vec<Number> {
    (1..=count).map(Number::new).collect()
}

/// Session holding `count` stored numbers with an empty change tracker.
pub fn seeded(count: i64) -> Session {
    seeded_with(count, SessionOptions::default())
}

pub fn seeded_with(count: i64, options: SessionOptions) -> Session {
    let mut session = session_with(options);
    session.add_range(numbers(count)).unwrap();
    session.save_changes().unwrap();
    session.clear_tracking();
    session
}

pub fn stored_numeric(session: &Session, id: i64) -> i64 {
    session
        .connection()
        .query_row("SELECT numeric FROM numbers WHERE id = ?1;", [id], |row| {
            row.get(0)
        })
        .unwrap()
}

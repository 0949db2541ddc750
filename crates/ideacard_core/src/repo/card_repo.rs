//! Card store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/query/atomic-update APIs over `cards` storage.
//! - Keep SQL and JSON column details inside the persistence boundary.
//! - Hydrate rows into fully populated `Card` values (defaults applied once).
//!
//! # Invariants
//! - `update_atomic` writes the field set, the version bump and the history
//!   append in one IMMEDIATE transaction, or writes nothing.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Listing order is `updated_at DESC, uuid ASC`.

use crate::db::DbError;
use crate::model::card::{Card, CardId, CardStyle, TodoItem};
use crate::model::history::{ChangeSet, HistoryEntry};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const CARD_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    content,
    style_json,
    todos_json,
    is_deleted,
    created_at,
    updated_at,
    version
FROM cards";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for card persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A write that was expected to apply modified no rows.
    NoRowsModified(CardId),
    InvalidData(String),
    Serialization(serde_json::Error),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NoRowsModified(id) => write!(f, "update modified no rows for card {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted card data: {message}"),
            Self::Serialization(err) => write!(f, "card serialization failed: {err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "card store is missing required table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Filter and cap for listing cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardQuery {
    /// `None` lists deleted and active cards alike.
    pub is_deleted: Option<bool>,
    pub limit: u32,
}

impl CardQuery {
    pub fn active(limit: u32) -> Self {
        Self {
            is_deleted: Some(false),
            limit,
        }
    }

    pub fn deleted(limit: u32) -> Self {
        Self {
            is_deleted: Some(true),
            limit,
        }
    }

    pub fn all(limit: u32) -> Self {
        Self {
            is_deleted: None,
            limit,
        }
    }
}

/// Fields to overwrite in one atomic update. `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFieldSet {
    pub title: Option<String>,
    pub content: Option<String>,
    pub style: Option<CardStyle>,
    pub todos: Option<Vec<TodoItem>>,
    pub is_deleted: Option<bool>,
    /// Always refreshed.
    pub updated_at: i64,
}

impl CardFieldSet {
    pub fn touch(updated_at: i64) -> Self {
        Self {
            title: None,
            content: None,
            style: None,
            todos: None,
            is_deleted: None,
            updated_at,
        }
    }
}

/// One atomic mutation: field set, optional history append and guards.
///
/// When a guard does not match the stored row, nothing is written and
/// `update_atomic` reports zero modified rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardUpdate {
    pub fields: CardFieldSet,
    pub history_append: Option<HistoryEntry>,
    pub expect_deleted: Option<bool>,
    pub expect_version: Option<i64>,
}

/// Document-store style gateway over the card collection.
pub trait CardStore {
    /// Persists a new card (and any history it already carries).
    fn insert(&mut self, card: &Card) -> RepoResult<CardId>;
    /// Loads one card with its full history, deleted or not.
    fn find_by_id(&self, id: CardId) -> RepoResult<Option<Card>>;
    /// Lists cards sorted by `updated_at DESC`, capped at `query.limit`.
    fn find_all(&self, query: &CardQuery) -> RepoResult<Vec<Card>>;
    /// Applies `update` as one operation and returns the modified row count.
    fn update_atomic(&mut self, id: CardId, update: &CardUpdate) -> RepoResult<usize>;
}

/// SQLite-backed card store.
pub struct SqliteCardStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteCardStore<'conn> {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        for table in ["cards", "card_history"] {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }
}

impl CardStore for SqliteCardStore<'_> {
    fn insert(&mut self, card: &Card) -> RepoResult<CardId> {
        let card_uuid = card.id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO cards (
                uuid,
                title,
                content,
                style_json,
                todos_json,
                is_deleted,
                created_at,
                updated_at,
                version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                card_uuid.as_str(),
                card.title.as_str(),
                card.content.as_str(),
                serde_json::to_string(&card.style)?,
                serde_json::to_string(&card.todos)?,
                bool_to_int(card.is_deleted),
                card.created_at,
                card.updated_at,
                card.version,
            ],
        )?;
        for entry in &card.history {
            append_history_in_tx(&tx, card_uuid.as_str(), entry)?;
        }

        tx.commit()?;
        Ok(card.id)
    }

    fn find_by_id(&self, id: CardId) -> RepoResult<Option<Card>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CARD_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_card_row(&*self.conn, row)?));
        }
        Ok(None)
    }

    fn find_all(&self, query: &CardQuery) -> RepoResult<Vec<Card>> {
        let mut sql = format!("{CARD_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(is_deleted) = query.is_deleted {
            sql.push_str(" AND is_deleted = ?");
            bind_values.push(Value::Integer(bool_to_int(is_deleted)));
        }

        sql.push_str(" ORDER BY updated_at DESC, uuid ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(query.limit)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next()? {
            cards.push(parse_card_row(&*self.conn, row)?);
        }
        Ok(cards)
    }

    fn update_atomic(&mut self, id: CardId, update: &CardUpdate) -> RepoResult<usize> {
        let card_uuid = id.to_string();
        let fields = &update.fields;
        let mut sql = String::from("UPDATE cards SET updated_at = ?, version = version + 1");
        let mut bind_values: Vec<Value> = vec![Value::Integer(fields.updated_at)];

        if let Some(title) = fields.title.as_ref() {
            sql.push_str(", title = ?");
            bind_values.push(Value::Text(title.clone()));
        }
        if let Some(content) = fields.content.as_ref() {
            sql.push_str(", content = ?");
            bind_values.push(Value::Text(content.clone()));
        }
        if let Some(style) = fields.style.as_ref() {
            sql.push_str(", style_json = ?");
            bind_values.push(Value::Text(serde_json::to_string(style)?));
        }
        if let Some(todos) = fields.todos.as_ref() {
            sql.push_str(", todos_json = ?");
            bind_values.push(Value::Text(serde_json::to_string(todos)?));
        }
        if let Some(is_deleted) = fields.is_deleted {
            sql.push_str(", is_deleted = ?");
            bind_values.push(Value::Integer(bool_to_int(is_deleted)));
        }

        sql.push_str(" WHERE uuid = ?");
        bind_values.push(Value::Text(card_uuid.clone()));
        if let Some(expect_deleted) = update.expect_deleted {
            sql.push_str(" AND is_deleted = ?");
            bind_values.push(Value::Integer(bool_to_int(expect_deleted)));
        }
        if let Some(expect_version) = update.expect_version {
            sql.push_str(" AND version = ?");
            bind_values.push(Value::Integer(expect_version));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            // Guard mismatch or missing row: leave history untouched.
            return Ok(0);
        }
        if let Some(entry) = update.history_append.as_ref() {
            append_history_in_tx(&tx, card_uuid.as_str(), entry)?;
        }
        tx.commit()?;
        Ok(changed)
    }
}

fn append_history_in_tx(
    tx: &Transaction<'_>,
    card_uuid: &str,
    entry: &HistoryEntry,
) -> RepoResult<()> {
    if entry.change_set.is_empty() {
        return Err(RepoError::InvalidData(format!(
            "refusing to append empty change-set `{}`",
            entry.history_id
        )));
    }

    tx.execute(
        "INSERT INTO card_history (
            history_id,
            card_uuid,
            seq,
            edit_time,
            operator,
            change_set_json,
            note
        )
        SELECT ?1, ?2, COALESCE(MAX(seq), 0) + 1, ?3, ?4, ?5, ?6
        FROM card_history
        WHERE card_uuid = ?2;",
        params![
            entry.history_id.as_str(),
            card_uuid,
            entry.edit_time,
            entry.operator.as_str(),
            serde_json::to_string(&entry.change_set)?,
            entry.note.as_deref(),
        ],
    )?;
    Ok(())
}

fn parse_card_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Card> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in cards.uuid"))
    })?;

    let style = match row.get::<_, Option<String>>("style_json")? {
        Some(json) => serde_json::from_str::<CardStyle>(&json).map_err(|err| {
            RepoError::InvalidData(format!("invalid cards.style_json for {uuid_text}: {err}"))
        })?,
        None => CardStyle::default(),
    };

    let todos = match row.get::<_, Option<String>>("todos_json")? {
        Some(json) => serde_json::from_str::<Vec<TodoItem>>(&json).map_err(|err| {
            RepoError::InvalidData(format!("invalid cards.todos_json for {uuid_text}: {err}"))
        })?,
        None => Vec::new(),
    };

    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in cards.is_deleted"
            )));
        }
    };

    Ok(Card {
        id,
        title: row.get("title")?,
        content: row.get("content")?,
        style,
        todos,
        is_deleted,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        version: row.get("version")?,
        history: load_history_for_card(conn, &uuid_text)?,
    })
}

fn load_history_for_card(conn: &Connection, card_uuid: &str) -> RepoResult<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT history_id, edit_time, operator, change_set_json, note
         FROM card_history
         WHERE card_uuid = ?1
         ORDER BY seq ASC;",
    )?;
    let mut rows = stmt.query([card_uuid])?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        let history_id: String = row.get("history_id")?;
        let json: String = row.get("change_set_json")?;
        let change_set: ChangeSet = serde_json::from_str(&json).map_err(|err| {
            RepoError::InvalidData(format!(
                "invalid card_history.change_set_json for {history_id}: {err}"
            ))
        })?;
        if change_set.is_empty() {
            return Err(RepoError::InvalidData(format!(
                "empty change-set in card_history {history_id}"
            )));
        }
        entries.push(HistoryEntry {
            history_id,
            edit_time: row.get("edit_time")?,
            operator: row.get("operator")?,
            change_set,
            note: row.get("note")?,
        });
    }
    Ok(entries)
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

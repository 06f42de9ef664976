//! SQLite-backed document store.
//!
//! Documents live in one table as JSON text. Partial updates are applied
//! inside SQLite with `json_set`, so a patch never rewrites fields it does
//! not name. Filters on scalar values run as `json_extract` conditions.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use denorm_model::Document;
use denorm_types::DocumentId;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::query::{Filter, Patch};
use crate::store::DocumentStore;

/// Document store persisted in SQLite.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StorageResult<()> {
        self.lock()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                schema TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                modified_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_schema ON documents(schema);
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Number of stored documents of `schema`.
    pub fn count(&self, schema: &str) -> StorageResult<usize> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM documents WHERE schema = ?1",
            params![schema],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

type RawRow = (String, String, i64, i64);

fn read_raw(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn to_document(schema: &str, (id, data, created_at, modified_at): RawRow) -> StorageResult<Document> {
    let id = DocumentId::parse(&id).map_err(|e| StorageError::InvalidData(e.to_string()))?;
    let data: Map<String, Value> = serde_json::from_str(&data)?;
    Ok(Document::from_stored(id, schema, data, created_at, modified_at))
}

fn load_matching(conn: &Connection, schema: &str, filter: &Filter) -> StorageResult<Vec<Document>> {
    let mut sql = String::from(
        "SELECT id, data, created_at, modified_at FROM documents WHERE schema = ?1",
    );
    let mut args = vec![SqlValue::Text(schema.to_string())];
    for (field, expected) in filter.clauses() {
        if let Some(condition) = clause_condition(field, expected, &mut args)? {
            sql.push_str(" AND ");
            sql.push_str(&condition);
        }
    }
    sql.push_str(" ORDER BY id");

    let mut stmt = conn.prepare(&sql)?;
    let raws = stmt
        .query_map(params_from_iter(args), read_raw)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut documents = Vec::with_capacity(raws.len());
    for raw in raws {
        let document = to_document(schema, raw)?;
        // Structured values are compared here only.
        if filter.matches(&document.data) {
            documents.push(document);
        }
    }
    Ok(documents)
}

fn push_arg(args: &mut Vec<SqlValue>, value: SqlValue) -> usize {
    args.push(value);
    args.len()
}

/// SQL condition for `field == expected`, binding its arguments.
///
/// `json_type` keeps SQLite from equating `true` with `1` or `"1"` with `1`.
/// Arrays and objects get no condition.
fn clause_condition(
    field: &str,
    expected: &Value,
    args: &mut Vec<SqlValue>,
) -> StorageResult<Option<String>> {
    let (value, types) = match expected {
        Value::Null => {
            let p = push_arg(args, SqlValue::Text(json_path(field)?));
            return Ok(Some(format!("json_extract(data, ?{p}) IS NULL")));
        }
        Value::Bool(flag) => {
            let p = push_arg(args, SqlValue::Text(json_path(field)?));
            let kind = if *flag { "'true'" } else { "'false'" };
            return Ok(Some(format!("json_type(data, ?{p}) = {kind}")));
        }
        Value::String(text) => (SqlValue::Text(text.clone()), "('text')"),
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(int), _) => (SqlValue::Integer(int), "('integer', 'real')"),
            (None, Some(real)) => (SqlValue::Real(real), "('integer', 'real')"),
            (None, None) => return Ok(None),
        },
        Value::Array(_) | Value::Object(_) => return Ok(None),
    };
    let p = push_arg(args, SqlValue::Text(json_path(field)?));
    let v = push_arg(args, value);
    Ok(Some(format!(
        "json_type(data, ?{p}) IN {types} AND json_extract(data, ?{p}) = ?{v}"
    )))
}

/// JSON path addressing a top-level key, quoted so dots are literal.
fn json_path(field: &str) -> StorageResult<String> {
    if field.is_empty() || field.contains('"') {
        return Err(StorageError::InvalidData(format!(
            "field name cannot be used as a patch key: {field:?}"
        )));
    }
    Ok(format!("$.\"{field}\""))
}

/// Builds `UPDATE ... SET data = json_set(data, p1, json(v1), ...)` for one id.
fn patch_statement(patch: &Patch) -> StorageResult<(String, Vec<SqlValue>)> {
    let mut args = Vec::with_capacity(patch.len() * 2);
    let mut setters = Vec::with_capacity(patch.len());
    for (field, value) in patch {
        // ?1 = modified_at, ?2 = schema, ?3 = id; pairs start at ?4
        let p = args.len() + 4;
        setters.push(format!("?{p}, json(?{})", p + 1));
        args.push(SqlValue::Text(json_path(field)?));
        args.push(SqlValue::Text(serde_json::to_string(value)?));
    }
    let sql = format!(
        "UPDATE documents SET data = json_set(data, {}), modified_at = ?1 \
         WHERE schema = ?2 AND id = ?3",
        setters.join(", ")
    );
    Ok((sql, args))
}

fn patch_params(modified_at: i64, schema: &str, id: DocumentId, args: &[SqlValue]) -> Vec<SqlValue> {
    let mut all = Vec::with_capacity(args.len() + 3);
    all.push(SqlValue::Integer(modified_at));
    all.push(SqlValue::Text(schema.to_string()));
    all.push(SqlValue::Text(id.to_string()));
    all.extend(args.iter().cloned());
    all
}

impl DocumentStore for SqliteDocumentStore {
    fn insert(&self, document: &Document) -> StorageResult<()> {
        let data = serde_json::to_string(&document.data)?;
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO documents (id, schema, data, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                document.id.to_string(),
                document.schema,
                data,
                document.created_at,
                document.modified_at
            ],
        )?;
        if inserted == 0 {
            return Err(StorageError::AlreadyExists(document.id.to_string()));
        }
        debug!("Inserted {} {}", document.schema, document.id);
        Ok(())
    }

    fn replace(&self, document: &Document) -> StorageResult<()> {
        let data = serde_json::to_string(&document.data)?;
        let updated = self.lock()?.execute(
            "UPDATE documents SET data = ?1, modified_at = ?2 WHERE schema = ?3 AND id = ?4",
            params![
                data,
                document.modified_at,
                document.schema,
                document.id.to_string()
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(document.id.to_string()));
        }
        debug!("Replaced {} {}", document.schema, document.id);
        Ok(())
    }

    fn find(&self, schema: &str, id: DocumentId) -> StorageResult<Option<Document>> {
        let raw = self
            .lock()?
            .query_row(
                "SELECT id, data, created_at, modified_at FROM documents
                 WHERE schema = ?1 AND id = ?2",
                params![schema, id.to_string()],
                read_raw,
            )
            .optional()?;
        raw.map(|raw| to_document(schema, raw)).transpose()
    }

    fn find_all(&self, schema: &str, filter: &Filter) -> StorageResult<Vec<Document>> {
        let conn = self.lock()?;
        load_matching(&conn, schema, filter)
    }

    fn update_one(&self, schema: &str, id: DocumentId, patch: &Patch) -> StorageResult<bool> {
        if patch.is_empty() {
            return Ok(self.find(schema, id)?.is_some());
        }
        let (sql, args) = patch_statement(patch)?;
        let now = chrono::Utc::now().timestamp_millis();
        let updated = self
            .lock()?
            .execute(&sql, params_from_iter(patch_params(now, schema, id, &args)))?;
        debug!("Patched {schema} {id} ({} fields)", patch.len());
        Ok(updated > 0)
    }

    fn update_many(&self, schema: &str, filter: &Filter, patch: &Patch) -> StorageResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let ids: Vec<DocumentId> = load_matching(&tx, schema, filter)?
            .into_iter()
            .map(|d| d.id)
            .collect();
        if ids.is_empty() || patch.is_empty() {
            return Ok(ids.len());
        }

        let (sql, args) = patch_statement(patch)?;
        let now = chrono::Utc::now().timestamp_millis();
        {
            let mut stmt = tx.prepare(&sql)?;
            for id in &ids {
                stmt.execute(params_from_iter(patch_params(now, schema, *id, &args)))?;
            }
        }
        tx.commit()?;
        debug!("Patched {} {schema} documents ({} fields)", ids.len(), patch.len());
        Ok(ids.len())
    }

    fn delete(&self, schema: &str, id: DocumentId) -> StorageResult<bool> {
        let deleted = self.lock()?.execute(
            "DELETE FROM documents WHERE schema = ?1 AND id = ?2",
            params![schema, id.to_string()],
        )?;
        Ok(deleted > 0)
    }
}

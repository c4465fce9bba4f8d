//! Statement builders shared by repository reads and unit-of-work flushes.
//!
//! All statements are derived from `Entity` metadata; table and column names
//! come from compile-time constants or from names already checked by
//! `Filter`/`OrderBy`.

use crate::model::{AnyEntity, City, Entity, EntityId, EntityKind, Person, PhoneNumber, Relationship};
use crate::repo::error::RepoResult;
use crate::repo::filter::{Filter, Page};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

fn select_sql<T: Entity>() -> String {
    format!(
        "SELECT id, {}, created_at, updated_at FROM {}",
        T::COLUMNS.join(", "),
        T::KIND.table()
    )
}

pub(crate) fn select<T: Entity>(
    conn: &Connection,
    where_sql: &str,
    mut bind_values: Vec<Value>,
    order_sql: &str,
    page: Option<Page>,
) -> RepoResult<Vec<T>> {
    let mut sql = select_sql::<T>();
    sql.push_str(where_sql);
    sql.push_str(order_sql);
    if let Some(page) = page {
        sql.push_str(" LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(page.size())));
        bind_values.push(Value::Integer(
            i64::try_from(page.offset()).unwrap_or(i64::MAX),
        ));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        entities.push(T::from_row(row)?);
    }
    Ok(entities)
}

pub(crate) fn select_by_id<T: Entity>(conn: &Connection, id: EntityId) -> RepoResult<Option<T>> {
    let sql = format!("{} WHERE id = ?1", select_sql::<T>());
    let entity = conn.query_row(&sql, [id], |row| T::from_row(row)).optional()?;
    Ok(entity)
}

/// Keys bound per `IN` lookup; stays well under SQLite's variable limit.
const KEY_CHUNK: usize = 500;

/// Loads every row of `kind` whose `column` is one of `keys`.
///
/// Keys are looked up in chunks of `KEY_CHUNK`. Rows sharing a key come from
/// the same chunk, so they stay ordered by id.
pub(crate) fn select_related(
    conn: &Connection,
    kind: EntityKind,
    column: &str,
    keys: &[EntityId],
) -> RepoResult<Vec<AnyEntity>> {
    match kind {
        EntityKind::City => select_in::<City>(conn, column, keys),
        EntityKind::Person => select_in::<Person>(conn, column, keys),
        EntityKind::PhoneNumber => select_in::<PhoneNumber>(conn, column, keys),
        EntityKind::Relationship => select_in::<Relationship>(conn, column, keys),
    }
}

fn select_in<T: Entity>(
    conn: &Connection,
    column: &str,
    keys: &[EntityId],
) -> RepoResult<Vec<AnyEntity>> {
    let mut related = Vec::new();
    for chunk in keys.chunks(KEY_CHUNK) {
        let (where_sql, bind_values) = Filter::new()
            .is_in(column, chunk.iter().copied())
            .to_sql::<T>()?;
        let rows = select::<T>(conn, &where_sql, bind_values, " ORDER BY id ASC", None)?;
        related.extend(rows.into_iter().map(Entity::into_any));
    }
    Ok(related)
}

/// Inserts one row and returns its identity.
///
/// A non-zero id on the entity is written explicitly; otherwise the store
/// generates one.
pub(crate) fn insert(conn: &Connection, entity: &AnyEntity) -> RepoResult<EntityId> {
    let explicit_id = entity.id();
    let audit = entity.audit();

    let mut names: Vec<&str> = Vec::with_capacity(entity.columns().len() + 3);
    let mut bind_values = Vec::with_capacity(names.capacity());
    if explicit_id != 0 {
        names.push("id");
        bind_values.push(Value::Integer(explicit_id));
    }
    names.extend_from_slice(entity.columns());
    bind_values.extend(entity.column_values());
    names.extend_from_slice(&["created_at", "updated_at"]);
    bind_values.push(Value::Integer(audit.created_at));
    bind_values.push(Value::Integer(audit.updated_at));

    let placeholders = (1..=names.len())
        .map(|position| format!("?{position}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders});",
        entity.kind().table(),
        names.join(", ")
    );
    conn.execute(&sql, params_from_iter(bind_values))?;

    if explicit_id != 0 {
        Ok(explicit_id)
    } else {
        Ok(conn.last_insert_rowid())
    }
}

/// Overwrites every writable column plus `updated_at`.
///
/// Returns the stored `created_at`, or `None` when no row has the entity's id.
pub(crate) fn update(conn: &Connection, entity: &AnyEntity) -> RepoResult<Option<i64>> {
    let columns = entity.columns();
    let assignments = columns
        .iter()
        .enumerate()
        .map(|(position, column)| format!("{column} = ?{}", position + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {assignments}, updated_at = ?{} WHERE id = ?{} RETURNING created_at;",
        entity.kind().table(),
        columns.len() + 1,
        columns.len() + 2
    );

    let mut bind_values = entity.column_values();
    bind_values.push(Value::Integer(entity.audit().updated_at));
    bind_values.push(Value::Integer(entity.id()));

    let created_at = conn
        .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))
        .optional()?;
    Ok(created_at)
}

/// Deletes one row by id and returns the number of rows removed.
pub(crate) fn delete(conn: &Connection, entity: &AnyEntity) -> RepoResult<usize> {
    let sql = format!("DELETE FROM {} WHERE id = ?1;", entity.kind().table());
    Ok(conn.execute(&sql, [entity.id()])?)
}

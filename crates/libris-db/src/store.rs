//! Generic persistence contract shared by every table.
//!
//! Statement text is assembled exclusively from [`QueryGuard`] output and the
//! implementor's table constant; values always travel as bound parameters.
//! Each write runs in its own transaction that commits on success and rolls
//! back when dropped.

use rusqlite::{Connection, Statement};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::guard::{Condition, Fragment, GuardError, QueryGuard, SET_PARAM_PREFIX};
use crate::record::{Fields, Filters, Params, Record};

pub trait RecordStore {
    /// Registered table name; must be known to [`QueryGuard`].
    const TABLE: &'static str;

    fn conn(&self) -> &Connection;

    /// Inserts exactly `fields` and returns the generated id.
    fn create(&self, fields: &Fields) -> StoreResult<i64> {
        let tx = self.conn().unchecked_transaction()?;
        let id = insert_into(&tx, Self::TABLE, fields)?;
        tx.commit()?;
        Ok(id)
    }

    /// First row matching all filters, or `None`.
    fn get(&self, filters: &Filters) -> StoreResult<Option<Record>> {
        let (where_clause, params) = filter_clause(Self::TABLE, filters)?;
        let sql = format!("SELECT * FROM {} WHERE {} LIMIT 1", Self::TABLE, where_clause);
        let mut records = fetch(self.conn(), &sql, &params)?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }

    /// Applies `update_data` to the matching row and returns it as updated.
    fn update(&self, update_data: &Fields, filters: &Filters) -> StoreResult<Option<Record>> {
        if update_data.is_empty() {
            return Err(StoreError::NoUpdateData);
        }
        let (where_clause, mut params) = filter_clause(Self::TABLE, filters)?;

        let mut set_params = Params::new();
        for (column, value) in update_data.iter() {
            set_params.insert(format!("{SET_PARAM_PREFIX}{column}"), value.clone());
        }
        let (set_clause, set_params) =
            QueryGuard::build_set_clause(Self::TABLE, &update_data.names(), &set_params)?;
        params.extend(set_params);

        let sql = format!(
            "UPDATE {} SET {} WHERE {} RETURNING *",
            Self::TABLE,
            set_clause,
            where_clause
        );

        let tx = self.conn().unchecked_transaction()?;
        let mut records = fetch(&tx, &sql, &params)?;
        tx.commit()?;

        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }

    /// Deletes every matching row. Refuses to run without filters.
    fn delete(&self, filters: &Filters) -> StoreResult<()> {
        let (where_clause, params) = filter_clause(Self::TABLE, filters)?;
        let sql = format!("DELETE FROM {} WHERE {}", Self::TABLE, where_clause);

        let tx = self.conn().unchecked_transaction()?;
        let removed = execute(&tx, &sql, &params)?;
        tx.commit()?;

        debug!(table = Self::TABLE, removed, "Deleted rows");
        Ok(())
    }
}

pub trait ListableStore: RecordStore {
    /// Rows matching every fragment, ordered by id, bounded by `params["limit"]`.
    fn list(&self, conditions: &[Fragment], params: &Params) -> StoreResult<Vec<Record>> {
        if !params.contains_key("limit") {
            return Err(GuardError::ParameterNotFound("limit".to_string()).into());
        }

        let where_clause = if conditions.is_empty() {
            Fragment::always_true().to_string()
        } else {
            conditions
                .iter()
                .map(Fragment::as_str)
                .collect::<Vec<_>>()
                .join(" AND ")
        };

        let sql = format!(
            "SELECT * FROM {} WHERE {} ORDER BY id ASC LIMIT :limit",
            Self::TABLE,
            where_clause
        );
        fetch(self.conn(), &sql, params)
    }
}

/// Equality WHERE clause over `filters`; empty filters are rejected.
pub(crate) fn filter_clause(table: &str, filters: &Filters) -> StoreResult<(Fragment, Params)> {
    if filters.is_empty() {
        return Err(StoreError::NoFilters);
    }

    let params: Params = filters
        .iter()
        .map(|(column, value)| (column.to_string(), value.clone()))
        .collect();
    let conditions: Vec<Condition<'_>> = filters
        .iter()
        .map(|(column, _)| Condition::new(column, "=", column))
        .collect();

    Ok(QueryGuard::build_where_clause(table, &conditions, params)?)
}

/// INSERT without opening a transaction; callers own the transaction scope.
pub(crate) fn insert_into(conn: &Connection, table: &str, fields: &Fields) -> StoreResult<i64> {
    if fields.is_empty() {
        return Err(StoreError::NoInsertData);
    }

    let mut columns = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());
    let mut params = Params::new();
    for (column, value) in fields.iter() {
        let column = QueryGuard::validate_column(table, column)?;
        columns.push(column);
        placeholders.push(format!(":{column}"));
        params.insert(column.to_string(), value.clone());
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );

    let record = fetch(conn, &sql, &params)?
        .into_iter()
        .next()
        .ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
    record.int("id")
}

pub(crate) fn fetch(conn: &Connection, sql: &str, params: &Params) -> StoreResult<Vec<Record>> {
    debug!(sql, "Executing query");
    let mut stmt = conn.prepare(sql)?;
    bind(&mut stmt, params)?;

    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.raw_query();
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(Record::from_row(row, &names)?);
    }
    Ok(records)
}

pub(crate) fn execute(conn: &Connection, sql: &str, params: &Params) -> StoreResult<usize> {
    debug!(sql, "Executing statement");
    let mut stmt = conn.prepare(sql)?;
    bind(&mut stmt, params)?;
    Ok(stmt.raw_execute()?)
}

/// Binds every placeholder the statement references. Entries of `params` the
/// statement does not use are ignored; a placeholder with no entry fails.
fn bind(stmt: &mut Statement<'_>, params: &Params) -> StoreResult<()> {
    for idx in 1..=stmt.parameter_count() {
        let name = match stmt.parameter_name(idx) {
            Some(placeholder) => placeholder.trim_start_matches(':').to_string(),
            None => format!("?{idx}"),
        };
        let value = params
            .get(&name)
            .ok_or(GuardError::ParameterNotFound(name))?;
        stmt.raw_bind_parameter(idx, value)?;
    }
    Ok(())
}

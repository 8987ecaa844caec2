//! The pooled PostgreSQL client.
//!
//! `Client` owns a SQLx `PgPool` and translates the string-templated helper
//! calls into SQL text plus bound parameters, executed on one pooled
//! connection per call. Connections are pool-owned RAII guards, so every
//! acquired connection is returned exactly once, on success and error paths
//! alike. Read statements run in autocommit mode; write statements run inside
//! an explicit transaction that commits after execution and rolls back when
//! the transaction guard is dropped on error. Failed writes are never
//! retried.

use std::time::Instant;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{Acquire, PgPool, Postgres};

use crate::config::ClientConfig;
use crate::convert::{self, bind_value, build_columns, decode_row};
use crate::error::{Error, Result};
use crate::row::{RowSet, ShapedRows, Value};
use crate::statement::{
    self, OrderBy, Statement, WhereClause, build_create, build_delete, build_drop, build_insert,
    build_select, build_truncate, build_update,
};

/// Result of executing a statement.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// The statement produced columns; the full result set.
    Rows(RowSet),
    /// The statement produced no columns; the affected-row count.
    Affected(u64),
}

impl QueryOutcome {
    /// The result set, if the statement produced columns.
    pub fn rows(self) -> Option<RowSet> {
        match self {
            QueryOutcome::Rows(set) => Some(set),
            QueryOutcome::Affected(_) => None,
        }
    }

    /// The affected-row count, if the statement produced none.
    pub fn affected(&self) -> Option<u64> {
        match self {
            QueryOutcome::Rows(_) => None,
            QueryOutcome::Affected(n) => Some(*n),
        }
    }
}

/// A PostgreSQL client over a pooled connection.
///
/// # Example
///
/// ```ignore
/// use pgkit::{Client, ClientConfig, WhereClause};
///
/// let client = Client::connect(ClientConfig::new("appdb", "app", "secret")).await?;
///
/// client
///     .insert("users", [("name", "ada"), ("role", "admin")], None)
///     .await?;
///
/// let rows = client
///     .select("users", &["id", "name"], Some(WhereClause::new("role = ?").bind("admin")), None, None, None)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    pool: PgPool,
    config: ClientConfig,
}

impl Client {
    /// Validate the configuration and create the underlying pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid configuration and
    /// [`Error::Setup`] when the pool cannot be created (bad credentials,
    /// unreachable host).
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database)
            .ssl_mode(convert::map_ssl_mode(config.ssl_mode))
            .options([("search_path", config.schema.as_str())]);

        // the pool, not the client, discards dead handles before handing
        // them out
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire.attempt_timeout)
            .test_before_acquire(true)
            .connect_with(options)
            .await
            .map_err(Error::Setup)?;

        tracing::info!(
            server = %config.display_name(),
            min = config.min_connections,
            max = config.max_connections,
            "created connection pool"
        );

        Ok(Self { pool, config })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Check that the pool can still serve queries.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Acquire one pooled connection, retrying timed-out attempts with
    /// exponential backoff up to the configured budget.
    async fn acquire(&self) -> Result<PoolConnection<Postgres>> {
        let opts = self.config.acquire;
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.pool.acquire().await {
                Ok(conn) => return Ok(conn),
                Err(sqlx::Error::PoolTimedOut) if attempts <= opts.max_retries => {
                    let backoff = opts.backoff_for(attempts);
                    tracing::warn!(
                        attempt = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "pool acquire timed out, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(sqlx::Error::PoolTimedOut) => {
                    return Err(Error::AcquireTimeout {
                        waited: started.elapsed(),
                        attempts,
                    });
                }
                Err(e) => return Err(Error::Execute(e)),
            }
        }
    }

    /// Execute an ad-hoc statement.
    ///
    /// The statement is classified by its leading keyword: reads run in
    /// autocommit mode, everything else commits explicitly. Returns rows when
    /// the statement produces columns (reads, or writes with a `RETURNING`
    /// clause), else the affected-row count.
    pub async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<QueryOutcome> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(Error::statement("empty statement"));
        }

        let mutating = statement::is_mutating(sql);
        tracing::debug!(sql, params = params.len(), mutating, "executing statement");

        let stmt = Statement {
            sql: sql.to_string(),
            params,
        };
        if mutating {
            let expect_rows = has_returning(&stmt.sql);
            self.run_write(stmt, expect_rows).await
        } else {
            self.run_read(stmt).await.map(QueryOutcome::Rows)
        }
    }

    /// `SELECT <fields> FROM <table> [WHERE ...] [ORDER BY ...] [LIMIT n]
    /// [OFFSET n]`. Empty `fields` selects `*`.
    pub async fn select(
        &self,
        table: &str,
        fields: &[&str],
        where_clause: Option<WhereClause>,
        order: Option<OrderBy>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<RowSet> {
        let stmt = build_select(table, fields, where_clause, order, limit, offset)?;
        tracing::debug!(sql = %stmt.sql, "select");
        self.run_read(stmt).await
    }

    /// Insert one row. Returns the inserted row(s) when `returning` is set,
    /// else the affected-row count.
    pub async fn insert<K, V>(
        &self,
        table: &str,
        data: impl IntoIterator<Item = (K, V)>,
        returning: Option<&str>,
    ) -> Result<QueryOutcome>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let data = collect_assignments(data);
        let stmt = build_insert(table, data, returning)?;
        tracing::debug!(sql = %stmt.sql, "insert");
        self.run_write(stmt, returning.is_some()).await
    }

    /// Update matching rows. Parameters are the new values followed by the
    /// WHERE clause's own. Returns rows when `returning` is set, else the
    /// affected-row count.
    pub async fn update<K, V>(
        &self,
        table: &str,
        data: impl IntoIterator<Item = (K, V)>,
        where_clause: Option<WhereClause>,
        returning: Option<&str>,
    ) -> Result<QueryOutcome>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let data = collect_assignments(data);
        let stmt = build_update(table, data, where_clause, returning)?;
        tracing::debug!(sql = %stmt.sql, "update");
        self.run_write(stmt, returning.is_some()).await
    }

    /// Delete matching rows. Same return contract as [`update`](Self::update).
    pub async fn delete(
        &self,
        table: &str,
        where_clause: Option<WhereClause>,
        returning: Option<&str>,
    ) -> Result<QueryOutcome> {
        let stmt = build_delete(table, where_clause, returning)?;
        tracing::debug!(sql = %stmt.sql, "delete");
        self.run_write(stmt, returning.is_some()).await
    }

    /// Truncate a table, optionally restarting identity columns and
    /// cascading to dependents.
    pub async fn truncate(&self, table: &str, restart_identity: bool, cascade: bool) -> Result<()> {
        let stmt = build_truncate(table, restart_identity, cascade)?;
        tracing::debug!(sql = %stmt.sql, "truncate");
        self.run_write(stmt, false).await.map(|_| ())
    }

    /// Drop a table if it exists.
    pub async fn drop_table(&self, table: &str, cascade: bool) -> Result<()> {
        let stmt = build_drop(table, cascade)?;
        tracing::debug!(sql = %stmt.sql, "drop table");
        self.run_write(stmt, false).await.map(|_| ())
    }

    /// Create a table from a column-definition body.
    pub async fn create_table(&self, table: &str, body: &str) -> Result<()> {
        let stmt = build_create(table, body)?;
        tracing::debug!(sql = %stmt.sql, "create table");
        self.run_write(stmt, false).await.map(|_| ())
    }

    /// Materialize a result set in the configured row shape.
    pub fn shape(&self, set: RowSet) -> ShapedRows {
        set.shaped(self.config.row_shape)
    }

    /// Run a read statement on one pooled connection in autocommit mode.
    async fn run_read(&self, stmt: Statement) -> Result<RowSet> {
        let Statement { sql, params } = stmt;
        let mut conn = self.acquire().await?;

        let mut query = sqlx::query(&sql);
        for value in params {
            query = bind_value(query, value)?;
        }
        let pg_rows = query
            .fetch_all(&mut *conn)
            .await
            .map_err(Error::Execute)?;

        Ok(rowset_from(pg_rows))
    }

    /// Run a write statement inside an explicit transaction. The transaction
    /// guard rolls back on drop if the statement or the commit fails.
    async fn run_write(&self, stmt: Statement, expect_rows: bool) -> Result<QueryOutcome> {
        let Statement { sql, params } = stmt;
        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await.map_err(Error::Execute)?;

        let mut query = sqlx::query(&sql);
        for value in params {
            query = bind_value(query, value)?;
        }

        let outcome = if expect_rows {
            let pg_rows = query.fetch_all(&mut *tx).await.map_err(Error::Execute)?;
            QueryOutcome::Rows(rowset_from(pg_rows))
        } else {
            let result = query.execute(&mut *tx).await.map_err(Error::Execute)?;
            QueryOutcome::Affected(result.rows_affected())
        };

        tx.commit().await.map_err(Error::Execute)?;
        Ok(outcome)
    }
}

/// Whether a mutating statement carries a `RETURNING` clause. A keyword
/// check, same discipline as the commit-mode classifier: the word is matched
/// at identifier boundaries and `--` line comments are skipped, but string
/// literals and block comments are not parsed — `'returning'` inside a
/// literal still counts.
fn has_returning(sql: &str) -> bool {
    sql.lines().any(|line| {
        let code = line.split("--").next().unwrap_or("");
        contains_keyword(code, "returning")
    })
}

/// Case-insensitive search for `keyword` bounded by non-identifier
/// characters on both sides. `keyword` must be ASCII lowercase.
fn contains_keyword(text: &str, keyword: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_';

    let mut start = 0;
    while let Some(pos) = lower[start..].find(keyword) {
        let begin = start + pos;
        let end = begin + keyword.len();
        let bounded_left = begin == 0 || !is_ident(bytes[begin - 1]);
        let bounded_right = end == bytes.len() || !is_ident(bytes[end]);
        if bounded_left && bounded_right {
            return true;
        }
        start = end;
    }
    false
}

fn collect_assignments<K, V>(data: impl IntoIterator<Item = (K, V)>) -> Vec<(String, Value)>
where
    K: Into<String>,
    V: Into<Value>,
{
    data.into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

fn rowset_from(pg_rows: Vec<PgRow>) -> RowSet {
    let Some(first) = pg_rows.first() else {
        return RowSet::empty();
    };

    let columns = build_columns(first);
    let rows = pg_rows
        .iter()
        .map(|pg_row| decode_row(pg_row, &columns))
        .collect();
    RowSet::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;
    use std::sync::Arc;

    #[test]
    fn test_has_returning() {
        assert!(has_returning("INSERT INTO t (a) VALUES ($1) RETURNING id"));
        assert!(has_returning("delete from t returning *"));
        assert!(has_returning("INSERT INTO t (a) VALUES ($1) RETURNING(id)"));
        assert!(has_returning(
            "UPDATE t SET a=$1 -- comment\nWHERE id=$2 RETURNING a"
        ));

        assert!(!has_returning("INSERT INTO t (a) VALUES ($1)"));
        assert!(!has_returning("UPDATE t SET returning_flag=$1"));
        assert!(!has_returning("DELETE FROM t -- returning would go here"));
        assert!(!has_returning("SELECT not_returning FROM t"));
    }

    #[test]
    fn test_query_outcome_accessors() {
        let affected = QueryOutcome::Affected(3);
        assert_eq!(affected.affected(), Some(3));
        assert!(affected.rows().is_none());

        let columns: Arc<[crate::row::ColumnInfo]> = [crate::row::ColumnInfo::new(
            "id".to_string(),
            "int4".to_string(),
            0,
        )]
        .into_iter()
        .collect();
        let set = RowSet::new(
            columns.clone(),
            vec![Row::new(columns, vec![Value::Int32(1)])],
        );
        let rows = QueryOutcome::Rows(set);
        assert!(rows.affected().is_none());
        assert_eq!(rows.rows().unwrap().len(), 1);
    }

    #[test]
    fn test_collect_assignments() {
        let data = collect_assignments([("a", 1i32), ("b", 2i32)]);
        assert_eq!(data[0], ("a".to_string(), Value::Int32(1)));
        assert_eq!(data[1], ("b".to_string(), Value::Int32(2)));
    }
}

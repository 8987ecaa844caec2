//! Statement assembly and classification.
//!
//! This module contains:
//! - `Statement` - SQL text plus its positional parameters
//! - `WhereClause` / `OrderBy` - caller-supplied clause fragments
//! - `is_mutating` - leading-keyword commit-mode classification
//! - `build_*` - pure builders for the string-templated helpers
//!
//! Caller fragments use `?` placeholders; builders rewrite each to the next
//! PostgreSQL `$n` in encounter order, so a WHERE fragment composes with the
//! data parameters that precede it. Values always travel as bound parameters;
//! table and column names are validated as plain (optionally schema-qualified)
//! identifiers before being interpolated. WHERE/ORDER/RETURNING fragments and
//! CREATE TABLE bodies remain caller-trusted raw text.

use crate::error::{Error, Result};
use crate::row::Value;

/// Statements whose leading keyword is in this list run without an explicit
/// commit; everything else takes the write path.
const READ_KEYWORDS: &[&str] = &["select", "with", "show", "explain", "values", "table"];

/// A SQL string plus its positional parameters, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// The SQL text, with `$n` placeholders
    pub sql: String,
    /// Parameters bound in placeholder order
    pub params: Vec<Value>,
}

/// A WHERE fragment with the parameters its placeholders consume.
///
/// # Example
///
/// ```
/// use pgkit::WhereClause;
///
/// let w = WhereClause::new("age > ? AND active = ?").bind(21).bind(true);
/// assert_eq!(w.params.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhereClause {
    /// Raw condition text with `?` placeholders
    pub fragment: String,
    /// One parameter per `?`, in order
    pub params: Vec<Value>,
}

impl WhereClause {
    /// Create a clause with no parameters.
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            params: Vec::new(),
        }
    }

    /// Create a clause with its parameters.
    pub fn with_params(fragment: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            fragment: fragment.into(),
            params,
        }
    }

    /// Append one parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }
}

impl From<&str> for WhereClause {
    fn from(fragment: &str) -> Self {
        Self::new(fragment)
    }
}

/// Sort direction for an ORDER BY clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// An ORDER BY expression with an optional direction.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Raw ordering expression (caller-trusted)
    pub expr: String,
    /// Optional direction keyword
    pub direction: Option<SortDirection>,
}

impl OrderBy {
    /// Order by an expression with the server's default direction.
    pub fn by(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            direction: None,
        }
    }

    /// Order ascending.
    pub fn asc(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            direction: Some(SortDirection::Asc),
        }
    }

    /// Order descending.
    pub fn desc(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            direction: Some(SortDirection::Desc),
        }
    }
}

/// Classify a statement by its leading keyword.
///
/// Returns `false` for statements on the read-only allow-list (`SELECT`,
/// `WITH`, ...), `true` for everything else. This is a token check, not a
/// parser; multi-statement strings classify on their leading token only.
pub fn is_mutating(sql: &str) -> bool {
    let token: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let token = token.to_ascii_lowercase();
    !READ_KEYWORDS.contains(&token.as_str())
}

/// Validate a table or column name: one or more `.`-separated segments, each
/// `[A-Za-z_][A-Za-z0-9_$]*`. Anything else (quotes, spaces, semicolons)
/// is rejected rather than interpolated.
fn check_ident(name: &str) -> Result<&str> {
    let valid_segment = |seg: &str| {
        let mut chars = seg.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    };

    if !name.is_empty() && name.split('.').all(valid_segment) {
        Ok(name)
    } else {
        Err(Error::statement(format!("invalid identifier `{name}`")))
    }
}

/// Incremental SQL assembler that tracks `$n` numbering across fragments.
#[derive(Debug, Default)]
struct SqlWriter {
    sql: String,
    params: Vec<Value>,
}

impl SqlWriter {
    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Append a bound value as the next `$n` placeholder.
    fn push_value(&mut self, value: Value) {
        self.params.push(value);
        self.sql.push('$');
        self.sql.push_str(&self.params.len().to_string());
    }

    /// Append a caller fragment, rewriting each `?` to the next `$n`.
    ///
    /// The number of `?` placeholders must match the number of parameters;
    /// a fragment that references inputs it does not supply is an error.
    /// The scan is not literal-aware: a `?` inside a quoted string in the
    /// fragment counts as a placeholder.
    fn push_fragment(&mut self, fragment: &str, params: Vec<Value>) -> Result<()> {
        let placeholders = fragment.matches('?').count();
        if placeholders != params.len() {
            return Err(Error::statement(format!(
                "fragment `{fragment}` has {placeholders} placeholder(s) but {} parameter(s)",
                params.len()
            )));
        }

        let mut params = params.into_iter();
        for ch in fragment.chars() {
            if ch == '?' {
                // count checked above
                let value = params.next().unwrap();
                self.params.push(value);
                self.sql.push('$');
                self.sql.push_str(&self.params.len().to_string());
            } else {
                self.sql.push(ch);
            }
        }
        Ok(())
    }

    fn push_where(&mut self, clause: Option<WhereClause>) -> Result<()> {
        if let Some(clause) = clause {
            self.push(" WHERE ");
            self.push_fragment(&clause.fragment, clause.params)?;
        }
        Ok(())
    }

    fn push_returning(&mut self, returning: Option<&str>) {
        if let Some(expr) = returning {
            self.push(" RETURNING ");
            self.push(expr);
        }
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Build `SELECT <fields> FROM <table> [WHERE ...] [ORDER BY ...] [LIMIT n]
/// [OFFSET n]`. Empty `fields` selects `*`.
pub fn build_select(
    table: &str,
    fields: &[&str],
    where_clause: Option<WhereClause>,
    order: Option<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
) -> Result<Statement> {
    check_ident(table)?;

    let mut w = SqlWriter::default();
    w.push("SELECT ");
    if fields.is_empty() {
        w.push("*");
    } else {
        w.push(&fields.join(","));
    }
    w.push(" FROM ");
    w.push(table);
    w.push_where(where_clause)?;
    if let Some(order) = order {
        w.push(" ORDER BY ");
        w.push(&order.expr);
        if let Some(direction) = order.direction {
            w.push(" ");
            w.push(direction.as_sql());
        }
    }
    if let Some(limit) = limit {
        w.push(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = offset {
        w.push(&format!(" OFFSET {offset}"));
    }
    Ok(w.finish())
}

/// Build `INSERT INTO <table> (<cols>) VALUES ($1,..) [RETURNING expr]`.
pub fn build_insert(
    table: &str,
    data: Vec<(String, Value)>,
    returning: Option<&str>,
) -> Result<Statement> {
    check_ident(table)?;
    if data.is_empty() {
        return Err(Error::statement("insert requires at least one column"));
    }

    let mut w = SqlWriter::default();
    w.push("INSERT INTO ");
    w.push(table);
    w.push(" (");
    for (i, (col, _)) in data.iter().enumerate() {
        check_ident(col)?;
        if i > 0 {
            w.push(",");
        }
        w.push(col);
    }
    w.push(") VALUES (");
    for (i, (_, value)) in data.into_iter().enumerate() {
        if i > 0 {
            w.push(",");
        }
        w.push_value(value);
    }
    w.push(")");
    w.push_returning(returning);
    Ok(w.finish())
}

/// Build `UPDATE <table> SET c1=$1,c2=$2 [WHERE ...] [RETURNING expr]`.
/// Parameters are the new values first, then the WHERE clause's own.
pub fn build_update(
    table: &str,
    data: Vec<(String, Value)>,
    where_clause: Option<WhereClause>,
    returning: Option<&str>,
) -> Result<Statement> {
    check_ident(table)?;
    if data.is_empty() {
        return Err(Error::statement("update requires at least one column"));
    }

    let mut w = SqlWriter::default();
    w.push("UPDATE ");
    w.push(table);
    w.push(" SET ");
    for (i, (col, value)) in data.into_iter().enumerate() {
        check_ident(&col)?;
        if i > 0 {
            w.push(",");
        }
        w.push(&col);
        w.push("=");
        w.push_value(value);
    }
    w.push_where(where_clause)?;
    w.push_returning(returning);
    Ok(w.finish())
}

/// Build `DELETE FROM <table> [WHERE ...] [RETURNING expr]`.
pub fn build_delete(
    table: &str,
    where_clause: Option<WhereClause>,
    returning: Option<&str>,
) -> Result<Statement> {
    check_ident(table)?;

    let mut w = SqlWriter::default();
    w.push("DELETE FROM ");
    w.push(table);
    w.push_where(where_clause)?;
    w.push_returning(returning);
    Ok(w.finish())
}

/// Build `TRUNCATE <table> [RESTART IDENTITY] [CASCADE]`.
pub fn build_truncate(table: &str, restart_identity: bool, cascade: bool) -> Result<Statement> {
    check_ident(table)?;

    let mut sql = format!("TRUNCATE {table}");
    if restart_identity {
        sql.push_str(" RESTART IDENTITY");
    }
    if cascade {
        sql.push_str(" CASCADE");
    }
    Ok(Statement {
        sql,
        params: Vec::new(),
    })
}

/// Build `DROP TABLE IF EXISTS <table> [CASCADE]`.
pub fn build_drop(table: &str, cascade: bool) -> Result<Statement> {
    check_ident(table)?;

    let mut sql = format!("DROP TABLE IF EXISTS {table}");
    if cascade {
        sql.push_str(" CASCADE");
    }
    Ok(Statement {
        sql,
        params: Vec::new(),
    })
}

/// Build `CREATE TABLE <table> (<body>)`. The body is caller-trusted.
pub fn build_create(table: &str, body: &str) -> Result<Statement> {
    check_ident(table)?;

    Ok(Statement {
        sql: format!("CREATE TABLE {table} ({body})"),
        params: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(!is_mutating("SELECT * FROM users"));
        assert!(!is_mutating("select 1"));
        assert!(!is_mutating("  WITH cte AS (SELECT 1) SELECT * FROM cte"));
        assert!(!is_mutating("EXPLAIN SELECT 1"));

        assert!(is_mutating("INSERT INTO users VALUES (1)"));
        assert!(is_mutating("update users set name = 'x'"));
        assert!(is_mutating("DELETE FROM users"));
        assert!(is_mutating("TRUNCATE users"));
        assert!(is_mutating("DROP TABLE users"));
        assert!(is_mutating("CREATE TABLE t (id int)"));
        assert!(is_mutating("ALTER TABLE t ADD COLUMN x int"));
    }

    #[test]
    fn test_check_ident() {
        assert!(check_ident("users").is_ok());
        assert!(check_ident("audit.users").is_ok());
        assert!(check_ident("_tmp$1").is_ok());

        assert!(check_ident("").is_err());
        assert!(check_ident("1users").is_err());
        assert!(check_ident("users; DROP TABLE users").is_err());
        assert!(check_ident("users\"").is_err());
        assert!(check_ident("a..b").is_err());
    }

    #[test]
    fn test_select_minimal() {
        let stmt = build_select("t", &[], None, None, None, None).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM t");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_select_with_all_clauses() {
        let stmt = build_select(
            "t",
            &["a", "b"],
            Some(WhereClause::new("a > ?").bind(5)),
            Some(OrderBy::desc("b")),
            Some(10),
            Some(20),
        )
        .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT a,b FROM t WHERE a > $1 ORDER BY b DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(stmt.params, vec![Value::Int32(5)]);
    }

    #[test]
    fn test_select_where_only() {
        let stmt = build_select(
            "t",
            &["a", "b"],
            Some(WhereClause::with_params("a > ?", vec![Value::Int32(5)])),
            None,
            None,
            None,
        )
        .unwrap();

        assert_eq!(stmt.sql, "SELECT a,b FROM t WHERE a > $1");
        assert_eq!(stmt.params, vec![Value::Int32(5)]);
    }

    #[test]
    fn test_insert() {
        let stmt = build_insert(
            "t",
            vec![
                ("a".to_string(), Value::Int32(1)),
                ("b".to_string(), Value::from("x")),
            ],
            None,
        )
        .unwrap();

        assert_eq!(stmt.sql, "INSERT INTO t (a,b) VALUES ($1,$2)");
        assert_eq!(stmt.params, vec![Value::Int32(1), Value::from("x")]);
    }

    #[test]
    fn test_insert_returning() {
        let stmt = build_insert("t", vec![("a".to_string(), Value::Int32(1))], Some("id")).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO t (a) VALUES ($1) RETURNING id");
    }

    #[test]
    fn test_insert_empty_data_rejected() {
        assert!(build_insert("t", vec![], None).is_err());
    }

    #[test]
    fn test_update_param_order() {
        let stmt = build_update(
            "t",
            vec![("x".to_string(), Value::Int32(1))],
            Some(WhereClause::new("id = ?").bind(3)),
            None,
        )
        .unwrap();

        assert_eq!(stmt.sql, "UPDATE t SET x=$1 WHERE id = $2");
        assert_eq!(stmt.params, vec![Value::Int32(1), Value::Int32(3)]);
    }

    #[test]
    fn test_update_multiple_columns() {
        let stmt = build_update(
            "t",
            vec![
                ("x".to_string(), Value::Int32(1)),
                ("y".to_string(), Value::Int32(2)),
            ],
            Some(WhereClause::new("id = ? OR id = ?").bind(3).bind(4)),
            Some("*"),
        )
        .unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE t SET x=$1,y=$2 WHERE id = $3 OR id = $4 RETURNING *"
        );
        assert_eq!(stmt.params.len(), 4);
    }

    #[test]
    fn test_delete() {
        let stmt = build_delete("t", Some(WhereClause::new("id = ?").bind(3)), None).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM t WHERE id = $1");
        assert_eq!(stmt.params, vec![Value::Int32(3)]);

        let stmt = build_delete("t", None, None).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM t");
    }

    #[test]
    fn test_fragment_param_mismatch_rejected() {
        // a fragment with placeholders but no params is an error, not a
        // silent pass-through
        let err = build_delete("t", Some(WhereClause::new("id = ?")), None).unwrap_err();
        assert!(err.to_string().contains("placeholder"));

        let err = build_select(
            "t",
            &[],
            Some(WhereClause::new("a = 1").bind(5)),
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn test_truncate_modifiers() {
        let stmt = build_truncate("t", true, true).unwrap();
        assert_eq!(stmt.sql, "TRUNCATE t RESTART IDENTITY CASCADE");

        let stmt = build_truncate("t", false, false).unwrap();
        assert_eq!(stmt.sql, "TRUNCATE t");

        let stmt = build_truncate("t", true, false).unwrap();
        assert_eq!(stmt.sql, "TRUNCATE t RESTART IDENTITY");
    }

    #[test]
    fn test_drop_and_create() {
        let stmt = build_drop("t", false).unwrap();
        assert_eq!(stmt.sql, "DROP TABLE IF EXISTS t");

        let stmt = build_drop("t", true).unwrap();
        assert_eq!(stmt.sql, "DROP TABLE IF EXISTS t CASCADE");

        let stmt = build_create("t", "id serial PRIMARY KEY, name text").unwrap();
        assert_eq!(stmt.sql, "CREATE TABLE t (id serial PRIMARY KEY, name text)");
    }

    #[test]
    fn test_bad_table_name_rejected() {
        assert!(build_select("users; --", &[], None, None, None, None).is_err());
        assert!(build_truncate("t t", false, false).is_err());
        assert!(build_insert("x'y", vec![("a".to_string(), Value::Null)], None).is_err());
    }

    #[test]
    fn test_bad_column_name_rejected() {
        let err = build_insert(
            "t",
            vec![("a\"b".to_string(), Value::Int32(1))],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Statement(_)));
    }
}

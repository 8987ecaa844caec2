//! Pooled PostgreSQL convenience client.
//!
//! A thin layer over SQLx's `PgPool`: one [`Client`] that owns the pool and
//! exposes string-templated helpers for common statements. It defines:
//!
//! - **Config** ([`config`]): connection parameters, pool bounds, SSL mode,
//!   result-row shape, acquire retry policy
//! - **Row/Value** ([`row`]): driver-agnostic value representation and
//!   shapeable result sets
//! - **Statement** ([`statement`]): leading-keyword classification and the
//!   pure SQL builders behind the helpers
//! - **Client** ([`client`]): pool setup, bounded acquire, autocommit reads,
//!   transactional writes
//!
//! # Example
//!
//! ```ignore
//! use pgkit::{Client, ClientConfig, WhereClause};
//!
//! let client = Client::connect(
//!     ClientConfig::new("appdb", "app", "secret").with_host("db.internal"),
//! )
//! .await?;
//!
//! client
//!     .create_table("users", "id serial PRIMARY KEY, name text NOT NULL")
//!     .await?;
//! client.insert("users", [("name", "ada")], None).await?;
//!
//! let rows = client
//!     .select("users", &["id", "name"], None, None, Some(10), None)
//!     .await?;
//! ```

pub mod client;
pub mod config;
mod convert;
pub mod error;
pub mod row;
pub mod statement;

pub use client::{Client, QueryOutcome};
pub use config::{AcquireOptions, ClientConfig, RowShape, SslMode};
pub use error::{Error, Result};
pub use row::{ColumnInfo, Row, RowSet, ShapedRows, Value};
pub use statement::{OrderBy, SortDirection, Statement, WhereClause, is_mutating};

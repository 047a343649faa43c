//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL,
//! following the repository pattern: API handlers talk to repositories in
//! [`handlers`], repositories run parameterized queries and return the record
//! structures in [`models`], and [`errors`] categorizes database failures into
//! cases application code can handle.
//!
//! Repositories wrap a `&mut PgConnection`, so a transaction spanning several
//! repositories is built by creating each repository from the same
//! transaction:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let request = Requests::new(&mut tx).get_by_id(id).await?;
//! Notifications::new(&mut tx).create(&notification).await?;
//! tx.commit().await?;
//! ```
//!
//! Migrations live in `migrations/` and are embedded via [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;

//! # joinery-orm
//!
//! Runs joinery statements against a database.
//!
//! This crate provides:
//! - [`Connection`], the seam to a driver, implemented for sqlx SQLite
//! - [`Dsl`], which resolves, renders and executes statements
//! - Materialisation of nested rows and multisets into [`ResultRow`]s
//! - [`UpdatableRecord`] for storing, deleting and refreshing records
//! - [`from_row`] for deserializing rows into any serde type
//!
//! ## Quick Start
//!
//! ```ignore
//! use joinery_core::prelude::*;
//! use joinery_orm::{Dsl, UpdatableRecord};
//! use sqlx::SqlitePool;
//!
//! async fn example(pool: SqlitePool, schema: Schema) -> joinery_core::Result<()> {
//!     let mut dsl = Dsl::new(pool, schema);
//!     let a = Athlete::table();
//!
//!     let names = dsl
//!         .fetch_all(&select((a.first_name(), a.club().name())).from(&a))
//!         .await?;
//!
//!     let mut athlete = dsl.new_record(&a);
//!     athlete.set(&a.first_name(), "Mondo").set(&a.last_name(), "Duplantis");
//!     athlete.store(&mut dsl).await?;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod de;
pub mod dsl;
pub mod fetched;
mod materialize;
pub mod record;
pub mod settings;
mod sqlite;

pub use connection::{Connection, Executed};
pub use de::{from_row, DeError};
pub use dsl::{Dsl, RowOf};
pub use fetched::Fetched;
pub use joinery_core::{Error, ResultRow, Result};
pub use record::UpdatableRecord;
pub use settings::{ReturningPolicy, Settings};

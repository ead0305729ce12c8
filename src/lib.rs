//! jsondb - a file-backed database of JSON tables
//!
//! Databases are directories, tables are JSON files holding a typed schema
//! and rows of string cells that are checked against that schema.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Façades (CLI)                          │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Database Service                          │
//! │  (guards, existence checks, projection, per-database locks)     │
//! ├──────────────────────────────┬──────────────────────────────────┤
//! │  ┌────────────────────────┐  │  ┌────────────────────────────┐  │
//! │  │      Validation        │  │  │       DbRepository         │  │
//! │  │  (names, schemes, row  │  │  │  (sole owner of the        │  │
//! │  │   fit, type registry)  │  │  │   on-disk layout)          │  │
//! │  └────────────────────────┘  │  └─────────────┬──────────────┘  │
//! └──────────────────────────────┴────────────────┼─────────────────┘
//!                                                 │
//!                                                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │               File System (JSON table files)                    │
//! │        /{storage_path}/{database}/tables/{table}.json           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use jsondb::{DatabaseService, Row, Settings, TableScheme};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let service = DatabaseService::new(Settings::new("./storage"))?;
//! service.create_database("shop").await?;
//! service
//!     .create_table(
//!         "shop",
//!         TableScheme::new("items", Vec::new())
//!             .attribute("sku", "char")
//!             .attribute("qty", "integer"),
//!     )
//!     .await?;
//! let row = service
//!     .add_row("shop", "items", Row::new(vec!["A".into(), "10".into()]))
//!     .await?;
//! assert_eq!(row.id, 0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod schema;
pub mod service;
pub mod storage;
pub mod validation;

pub use config::Settings;
pub use error::{Error, ErrorKind, Result};
pub use schema::types::{DataType, TypeRegistry};
pub use schema::{Attribute, Database, Row, RowId, Table, TableScheme};
pub use service::DatabaseService;
pub use validation::{DatabaseValidation, Validation};

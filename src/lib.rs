//! pxstat_rs
//!
//! A small Rust library for querying a PxStat JSON-RPC API (such as the Irish
//! Central Statistics Office's) and flattening the JSON-stat cube it returns into
//! a table. Pairs with the `pxstat` CLI.
//!
//! ### Features
//! - POST a caller-built JSON-RPC query and get a [`ResultTable`] back
//! - Distinct errors for transport failures, API-reported failures and malformed responses
//! - JSON-stat 2.0 datasets and collections, plus 1.x datasets and bundles
//! - Save tables as CSV or JSON, quick summary statistics
//!
//! ### Example
//! ```no_run
//! use pxstat_rs::Client;
//!
//! let client = Client::default();
//! let query = std::fs::read_to_string("query.json")?;
//! let table = client.fetch(&query)?;
//! pxstat_rs::storage::save_csv(&table, "out.csv")?;
//! let stats = pxstat_rs::stats::summary(&table);
//! println!("{:#?}", stats);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod error;
pub mod jsonstat;
pub mod models;
pub mod stats;
pub mod storage;

pub use api::{Client, ClientBuilder, DEFAULT_ENDPOINT};
pub use error::{Error, Result};
pub use models::{ResultTable, Row};

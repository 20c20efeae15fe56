//! # Change Tracker
//!
//! A local-first tracker for competitor page changes.
//!
//! A scraper captures competitor pages (title, heading, description, body
//! text, keyword occurrences). Change Tracker stores those captures in
//! SQLite, records a change event whenever a tracked field differs from
//! the previous capture of the same page, and renders diff reports and
//! yearly activity calendars from them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────┐
//! │ JSON export │──▶│    Ingest    │──▶│  SQLite   │
//! │ (scraper)   │   │ detect diffs │   │ snapshots │
//! └─────────────┘   └──────────────┘   │ changes   │
//!                                      └─────┬─────┘
//!                                            ▼
//!                                     ┌────────────┐
//!                                     │ CLI reports│
//!                                     │ (ctrack)   │
//!                                     └────────────┘
//! ```
//!
//! The differs and the calendar aggregation live in the I/O-free
//! `change-tracker-core` crate; this crate supplies configuration,
//! persistence, and the command-line surface.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `SnapshotStore` |
//! | [`ingest`] | Capture ingestion and change detection |
//! | [`diff_cmd`] | Diff reports |
//! | [`calendar`] | Activity calendars |
//! | [`history`] | Keyword histories |
//! | [`changes`] | Change listings |
//! | [`browse`] | Competitor, page, and capture listings |

pub mod browse;
pub mod calendar;
pub mod changes;
pub mod config;
pub mod db;
pub mod diff_cmd;
pub mod history;
pub mod ingest;
pub mod migrate;
pub mod sqlite_store;

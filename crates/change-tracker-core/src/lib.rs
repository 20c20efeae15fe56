//! # Change Tracker Core
//!
//! Shared, I/O-free logic for Change Tracker: snapshot models, the keyword
//! ledger, field and content differs, the activity calendar aggregator, and
//! the snapshot store abstraction.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Every diff and aggregation function is a pure,
//! total function over in-memory data.
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`keywords`] | Parse and diff `"<keyword> - <N> разів"` occurrence strings |
//! | [`fields`] | Compare scalar metadata fields between two snapshots |
//! | [`content`] | LCS line diff of page body text |
//! | [`activity`] | Bucket change events by day and build dense year calendars |
//! | [`report`] | Composite diff report and change detection |
//! | [`store`] | Persistence boundary trait and in-memory backend |

pub mod activity;
pub mod content;
pub mod fields;
pub mod keywords;
pub mod models;
pub mod report;
pub mod store;

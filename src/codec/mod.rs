//! Codec module - decoding of `key: value` response bodies.
//!
//! Most daemon responses are flat lists of `key: value` lines. This module
//! provides:
//!
//! - [`parse_pair`] / [`Pairs`] - split lines into key and value
//! - [`group_records`] / [`Record`] - split a flat list into records whenever a
//!   marker key starts a new one (e.g. `file` in a playlist listing)
//!
//! # Example
//!
//! ```
//! use mpc_client::codec::group_records;
//!
//! let lines = ["file: a.flac", "Title: A", "file: b.flac", "Title: B"];
//! let records = group_records(&lines, &["file"]);
//!
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1].get("Title"), Some("B"));
//! ```

mod record;

pub use record::{group_records, parse_pair, Pairs, Record};

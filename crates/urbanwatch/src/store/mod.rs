//! # Storage Layer
//!
//! This module defines the storage abstraction for urbanwatch. The [`KvBackend`]
//! trait is the only thing the rest of the crate knows about persistence: an async,
//! string-keyed, string-valued store with `get`, `set` and `remove`.
//!
//! ## Keys
//!
//! Three disjoint keys live in one backend, each owned by exactly one component:
//!
//! | Key (default) | Owner | Value |
//! |---------------|-------|-------|
//! | `reports` | [`ReportStore`] | JSON array of normalized reports |
//! | `reportDraft` | [`crate::draft::DraftStore`] | one JSON draft object |
//! | `userLocation` | [`crate::location::LocationCache`] | one JSON location fix |
//!
//! An absent key always means "empty/default", never an error. Because the keys
//! are disjoint, operations on different keys never race with each other.
//!
//! ## The Report List
//!
//! [`ReportStore`] keeps the canonical list. Its invariants hold after every
//! mutation:
//! - **Unique ids**: duplicates collapse, the last one read wins.
//! - **Bounded**: at most `max_reports` entries; the oldest by timestamp go first.
//! - **Normalized**: every entry passed through [`crate::model::ReportInput::normalize`].
//! - **Ordered**: newest first by timestamp.
//!
//! ## Read Failures
//!
//! Reads never fail outward. [`ReportStore::load_reports`] reports *why* a read came
//! back empty ([`LoadOutcome`]), while [`ReportStore::list_reports`] collapses that to
//! an empty list for callers that only want something to render.
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: one JSON file per key, atomic tmp+rename writes.
//! - [`mem_backend::MemBackend`]: in-memory, with error injection for tests.
//!
//! ## Storage Layout
//!
//! ```text
//! <data dir>/
//! ├── urbanwatch.toml     # Configuration (optional)
//! ├── reports.json        # Report list
//! ├── reportDraft.json    # In-progress draft (optional)
//! └── userLocation.json   # Cached location fix (optional)
//! ```

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;
pub mod memory;
pub mod report_store;

pub use backend::KvBackend;
pub use report_store::{LoadOutcome, ReportStore, SaveOutcome};

//! # Urbanwatch Architecture
//!
//! Urbanwatch is the core of a citizen issue-reporting app: potholes, overflowing
//! bins, broken street lights. It is a library with a CLI client, not the other
//! way around; every screen of the app is a thin caller of [`api::UrbanApi`].
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  UI Layer (urbanwatch-cli, or any other client)             │
//! │  - Parses input, formats output, owns the terminal          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - One struct wiring store, draft, location over a backend  │
//! │  - Returns structured Result types                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Core (model, store, views, draft, location)                │
//! │  - Normalization and list invariants                        │
//! │  - Pure derived views: filter, sort, analytics              │
//! │  - Draft autosave and location fallback chain               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (store/backend.rs)                                 │
//! │  - Async KvBackend trait                                    │
//! │  - FsBackend (production), MemBackend (testing)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No I/O Assumptions in Core
//!
//! From `api.rs` inward, code never writes to stdout/stderr and never exits the
//! process. Diagnostics go through `tracing`; installing a subscriber is the
//! client's job.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`model`]: `Report`, `ReportInput` and normalization
//! - [`store`]: Backend trait, backends and the report store
//! - [`views`]: Filters, sorts, distances, analytics
//! - [`draft`]: Draft persistence and debounced autosave
//! - [`location`]: Cached fix, resolver chain and IP lookup
//! - [`config`]: Configuration management
//! - [`init`]: Data directory resolution and startup
//! - [`error`]: Error types

pub mod api;
pub mod config;
pub mod draft;
pub mod error;
pub mod init;
pub mod location;
pub mod model;
pub mod store;
pub mod views;

#[cfg(test)]
mod test_utils;

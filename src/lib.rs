//! # Context Uplink
//!
//! A local indexing agent that mirrors project source trees into a remote
//! context service.
//!
//! Context Uplink walks a project, slices its text files into fixed line
//! windows ("blobs"), uploads only what changed since the last run, and keeps
//! a local record of what the remote index holds. Search queries go to the
//! service; no similarity or ranking is ever computed locally.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐
//! │ Identity │──▶│ Scanner  │──▶│ Chunker  │──▶│   Diff    │
//! │ resolve  │   │ walkdir  │   │ windows  │   │ id sets   │
//! └──────────┘   └──────────┘   └──────────┘   └────┬──────┘
//!                                                   │
//!                     ┌─────────────────────────────┤
//!                     ▼                             ▼
//!               ┌──────────┐                ┌───────────────┐
//!               │  Store   │◀── per batch ──│    Remote     │
//!               │ projects │                │ upload/delete │
//!               └──────────┘                └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! uplink index /home/me/project         # first upload
//! uplink search /home/me/project "login handler"
//! uplink projects                       # what this machine has indexed
//! uplink check 'C:\Users\me\project'    # any path dialect works
//! uplink serve                          # admin HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`identity`] | Canonical project identity across path dialects |
//! | [`config`] | Settings file, validation, live reload |
//! | [`scanner`] | Project tree walk with exclusions |
//! | [`chunker`] | Fixed line-window blobs |
//! | [`diff`] | Blob id set difference |
//! | [`remote`] | HTTP client for the index service |
//! | [`store`] | Local record of uploaded blob ids |
//! | [`indexer`] | The batched upload pipeline |
//! | [`search`] | Remote search with optional pre-index |
//! | [`server`] | Administrative HTTP API |

pub mod chunker;
pub mod config;
pub mod diff;
pub mod error;
pub mod identity;
pub mod indexer;
pub mod logging;
pub mod models;
pub mod remote;
pub mod scanner;
pub mod search;
pub mod server;
pub mod store;

//! # repo-context
//!
//! Turns a source repository into one bounded, deterministic text context
//! (plus a few notebook images) for consumption by AI models.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌────────────────┐   ┌─────────────────┐
//! │ Workspace │──▶│TraversalFilter│──▶│ContentExtractor│──▶│ ContextAssembler │
//! │ git clone │   │ dirs/files/ext│   │ text / notebook│   │ text+images+count│
//! └───────────┘   └──────────────┘   └───────┬────────┘   └─────────────────┘
//!                                            ▼
//!                                      ┌───────────┐
//!                                      │ImageBudget│
//!                                      └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! repoctx ingest https://github.com/org/repo.git --output repo_context.txt
//! repoctx scan ./checkout --max-chars 85000 --images-dir ./plots
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`workspace`] | Ephemeral git clone with scoped cleanup |
//! | [`filter`] | Directory/file inclusion policy |
//! | [`extract`] | Per-file text extraction |
//! | [`notebook`] | Jupyter notebook parsing and rendering |
//! | [`images`] | Image decoding under a run-wide cap |
//! | [`assemble`] | Deterministic walk and concatenation |
//! | [`ingest`] | Run orchestration |
//! | [`export`] | Writing text and images to disk |

pub mod assemble;
pub mod config;
pub mod export;
pub mod extract;
pub mod filter;
pub mod images;
pub mod ingest;
pub mod models;
pub mod notebook;
pub mod workspace;

pub use ingest::{ingest_directory, ingest_repository, IngestError};
pub use models::AssembledContext;

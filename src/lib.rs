//! # sdds
//!
//! Reader and writer for Self-Describing Data Sets:
//! - Text header of namelist definitions (parameters, arrays, columns)
//! - Pages of data in ASCII or binary, row- or column-major
//! - Streaming reads: every page, sparse pages, last rows of each page
//! - Streaming writes: whole pages, partial flushes, appends to existing files
//! - Bounded registry of open handles
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SddsContext                           │
//! │               (Config + HandleRegistry 0..=N)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ SddsReader  │          │ SddsWriter  │
//!   │ (pages in)  │          │ (pages out) │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          └───────────┬────────────┘
//!                      ▼
//!   ┌─────────────────────────────────────────────┐
//!   │   Layout (definitions)  +  Page (values)    │
//!   │   header namelists         ascii / binary   │
//!   └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//!              ┌─────────────┐
//!              │  PageStore  │
//!              │ (in memory) │
//!              └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod types;
pub mod layout;
pub mod page;
pub mod codec;
pub mod registry;
pub mod context;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, SddsError};
pub use config::{Config, ConfigBuilder};
pub use context::SddsContext;

pub use codec::{PageRead, SddsReader, SddsWriter, UpdateMode};
pub use layout::{ArrayDefinition, ColumnDefinition, Definition, ParameterDefinition};
pub use layout::{CheckStatus, Description, Layout};
pub use page::{ArrayValue, Page, PageStore, ValueBuffer};
pub use registry::{HandleRegistry, HandleSlot};
pub use types::{ByteOrder, DataMode, DataType, FormatSpec, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

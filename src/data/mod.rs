//! Data layer: loading, validation, merging, projection and filtering.
//!
//! Architecture:
//! ```text
//!  features.csv   clusters.csv          telemetry.csv (optional)
//!        │             │                       │
//!        ▼             ▼                       ▼
//!   ┌──────────────────────┐           ┌────────────┐
//!   │ loader + schema       │           │ telemetry  │  coerce, drop, degrade
//!   └──────────────────────┘           └────────────┘
//!        │                                     │
//!        ▼                                     │
//!   ┌──────────┐                               │
//!   │  merge    │  (Driver, Race) join + synthetic LapTime
//!   └──────────┘                               │
//!        │                                     │
//!        ▼                                     │
//!   ┌──────────┐   ┌──────────┐                │
//!   │  scale    │─▶│   pca     │                │
//!   └──────────┘   └──────────┘                │
//!        │              │                      │
//!        ▼              ▼                      ▼
//!   ┌────────────────────────────────────────────┐
//!   │ snapshot   immutable, shared via Arc        │
//!   └────────────────────────────────────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  selection → row indices per table
//!   └──────────┘
//! ```

pub mod diagnostics;
pub mod filter;
pub mod loader;
pub mod merge;
pub mod model;
pub mod pca;
pub mod scale;
pub mod schema;
pub mod snapshot;
pub mod summary;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod fixtures;

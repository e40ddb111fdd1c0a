//! Data layer: core types, loading, and filtering.
//!
//! Architecture:
//! ```text
//!  .csv / .json / synthetic params
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse or generate → Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  Table    │  Vec<Row>, column index
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  date range + category predicates → filtered Table
//!   └──────────┘
//! ```

pub mod filter;
pub mod loader;
pub mod model;

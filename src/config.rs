//! Default constants for sample-data generation and filtering.

/// Default date span covered by the generated sample dataset (inclusive).
pub const DEFAULT_SAMPLE_START: &str = "2023-01-01";
pub const DEFAULT_SAMPLE_END: &str = "2023-12-31";

/// Seed used by the demo generator so runs are reproducible.
pub const DEFAULT_SEED: u64 = 42;

/// Category pools for the synthetic dataset.
pub const DEFAULT_REGIONS: &[&str] = &["North", "South", "East", "West"];
pub const DEFAULT_PRODUCTS: &[&str] =
    &["Product A", "Product B", "Product C", "Product D"];
pub const DEFAULT_CATEGORIES: &[&str] = &["Electronics", "Clothing", "Food", "Books"];

/// Upper bound on distinct values offered per category filter.
pub const MAX_FILTER_OPTIONS: usize = 50;

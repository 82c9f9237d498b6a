//! Queries across every index of a selector

pub mod executor;

pub use executor::{IndexFailure, IndexHits, QueryExecutor, SelectorResults};

//! Transformation module.
//!
//! - Aggregator: split, explode and group deal rows by fund manager
//! - Pipeline: parse → select columns → aggregate, with progress logs

pub mod aggregator;
pub mod pipeline;

pub use aggregator::{aggregate, aggregate_records, deal_records, AggregationResult, AmountPolicy};
pub use pipeline::*;

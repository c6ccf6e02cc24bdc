//! # trcat
//! Interval processing for building a tandem repeat reference catalog:
//! filtering raw BED regions, translating TRF hits back to genome
//! coordinates, joining regions with indexed annotations, overlap count
//! distributions between region sets, and span statistics.

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod utils;

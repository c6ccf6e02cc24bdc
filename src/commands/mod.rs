pub mod annotate;
pub mod filter;
pub mod intersect;
pub mod repmask;
pub mod stats;
pub mod trf;

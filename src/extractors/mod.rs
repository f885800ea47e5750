// src/extractors/mod.rs
pub mod contacts;
pub mod fields;
pub mod identity;
pub mod normalize;
pub mod section;
pub mod segment;
pub mod text;

// Re-export key extraction types for convenience
pub use fields::RecordExtractor;
pub use normalize::{NormalizedCorpus, Normalizer};
pub use segment::segment;

//! # Identification
//!
//! Time-interval bookkeeping of which ant wears which tag.
//!
//! - [`IntervalIndex`]: per-key disjoint interval store, shared with zone
//!   definitions
//! - [`MutableIdentifier`]: validated edits of identifications
//! - [`CompiledIdentifier`]: immutable, `O(log n)` lookups, shared by query
//!   workers through an `Arc`

pub mod identifier;
pub mod interval_index;

pub use identifier::{
    CompiledIdentifier, Identification, IdentifierError, MutableIdentifier, TagPose,
};
pub use interval_index::{IntervalError, IntervalIndex, OverlapError};

//! Two-layer filtering: pre-index [`match_opts`] rules applied at
//! ingest, post-index [`display`] filters applied at snapshot time, and
//! the [`attribute`] engine that computes displayable per-call/message
//! values (§4.9).

pub mod attribute;
pub mod display;
pub mod match_opts;

pub use attribute::{builtin_attributes, Attribute};
pub use display::DisplayFilters;
pub use match_opts::StorageMatchOpts;

//! Result processing layer
//!
//! Typed result sets arrive from the backend, flow through the view
//! pipeline (filter, sort, paginate, format) and feed the summary
//! cards and export serializers. Everything here is pure and
//! synchronous; rendering and I/O live elsewhere.

pub mod exporter;
pub mod format;
pub mod result_set;
pub mod stats;
pub mod view;

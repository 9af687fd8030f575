//! HTTP handler implementations, one module per resource.

pub mod datasets;
pub mod datasources;
pub mod queue;

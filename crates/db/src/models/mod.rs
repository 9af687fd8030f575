//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for inserts and query parameters

pub mod catalog;
pub mod dataset;
pub mod event;
pub mod post;
pub mod status;
pub mod worker;

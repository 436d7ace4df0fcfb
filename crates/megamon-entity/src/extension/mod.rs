//! Extension entity models.

pub mod manifest;
pub mod model;

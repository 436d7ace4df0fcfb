//! HTTP handlers, organized by route family.

pub mod extension;
pub mod health;
pub mod proxy;

//! HTTP routes grouped by domain area.

pub mod orders;
pub mod stock;
pub mod system;

//! HTTP route modules.

pub mod assets;
pub mod dataversion;
pub mod events;

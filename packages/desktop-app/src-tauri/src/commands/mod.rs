//! Tauri command surface consumed by the bootstrap page

pub mod about;
pub mod bootstrap;

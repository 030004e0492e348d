// Adapters layer: concrete implementations for the console web UI and its internal API.

pub mod browser;
pub mod console;

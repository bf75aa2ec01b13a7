// Adapters layer: concrete implementations for external systems.

pub mod http_model;
pub mod memory_store;

//! Adapters implementing the domain ports.

pub mod catalog;
pub mod embeddings;
pub mod memory;
pub mod models;
pub mod sqlite;
pub mod tools;

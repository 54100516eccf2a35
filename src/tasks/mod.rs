//! Background Tasks Module
//!
//! Contains tasks that run detached from the request that started them.
//!
//! # Tasks
//! - Cache write: stores a copy of a network response after it has been returned

mod cache_write;

pub use cache_write::spawn_cache_write;

//! Embedded relational store (C2), round search cache (C6), and settings
//! persistence (C10). One [`Store`] per process; every repository borrows
//! it and is cheap to construct per call.

pub mod convert;
pub mod models;
pub mod pool;
pub mod repo;
pub mod schema;

pub use pool::Store;
pub use repo::*;

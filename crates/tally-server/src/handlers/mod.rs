//! HTTP request handlers

pub mod health;
pub mod ingest;

pub use health::*;
pub use ingest::*;

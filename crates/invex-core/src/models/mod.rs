//! Data models for records, batches and configuration.

pub mod batch;
pub mod config;
pub mod record;

//! Inbound routing layer.
//!
//! Holds the duplicate-detection state and the ordered subscription rules that decide
//! which storages, publications and processors see an incoming file.

pub mod dedup_cache;
pub mod subscription;

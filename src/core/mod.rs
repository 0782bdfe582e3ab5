//! Core infrastructure shared across the crate.

pub mod http_client;

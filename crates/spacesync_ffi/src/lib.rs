//! FFI bridge crate for host UI integration.

pub mod api;

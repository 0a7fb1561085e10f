//! Use-case services for application callers.

pub mod space_service;

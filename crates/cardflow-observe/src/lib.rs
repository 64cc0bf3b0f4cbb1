//! Observability setup for cardflow binaries.

pub mod tracing_setup;

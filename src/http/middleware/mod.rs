//! HTTP middleware.

pub mod inspect;

pub use inspect::inspect_middleware;

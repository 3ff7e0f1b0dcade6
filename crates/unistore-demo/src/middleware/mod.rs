//! Middleware of the demo

pub mod clamp_middleware;

pub use clamp_middleware::ClampMiddleware;

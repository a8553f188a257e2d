//! Agrocrew Engine Library
//!
//! This library provides the core functionality of the Agrocrew engine.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Crew model, loader, resolver and sequential engine
pub mod crew;

/// Tool registry and built-in tools
pub mod tools;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

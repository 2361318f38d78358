#![deny(missing_docs)]

//! Core library for the docsum document extraction and summarization server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction from PDFs and images.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Upload and summary counters.
pub mod metrics;
/// Request orchestration shared by the HTTP server and the CLI.
pub mod service;
/// Length-bounded summarization through a generation provider.
pub mod summarization;

//! API module
//!
//! This module provides the API functionality for the gentask tool,
//! including the server, the web UI it renders, and the HTTP client.

pub mod client;
pub mod server;

// Re-export commonly used types
pub use client::{Client, ClientConfig, ClientError};
pub use server::{serve, ApiState, ServerConfig};

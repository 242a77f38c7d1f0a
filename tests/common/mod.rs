//! Integration test common infrastructure.
//!
//! Utilities for spawning fennecd instances and driving them with raw
//! protocol lines.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;

/// Password every test server is configured with.
pub const TEST_PASSWORD: &str = "hunter2";

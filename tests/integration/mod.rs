//! Integration tests with mock HTTP server

pub mod client;
pub mod executor;
pub mod mock_server;

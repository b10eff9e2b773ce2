//! Mock collaborators for integration tests
//!
//! The HTTP collaborators (session endpoint, function handler) are mocked with
//! `wiremock`; the realtime stream needs a real WebSocket server.

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod realtime_mock;

pub use realtime_mock::MockRealtimeServer;

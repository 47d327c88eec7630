//! Integration tests for Playdeck
//!
//! These tests verify how the session, the streaming adapter, the controller
//! and the history store work together across crate boundaries.

#[path = "integration/history_persistence.rs"]
mod history_persistence;

#[path = "integration/session_flow.rs"]
mod session_flow;

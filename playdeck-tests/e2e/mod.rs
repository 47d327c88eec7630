//! End-to-end tests for Playdeck
//!
//! These tests follow complete user workflows from a search keyword to a
//! playing video and a history entry.

mod search_to_history;

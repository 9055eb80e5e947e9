//! Integration tests for the in-memory page store
//!
//! These tests verify:
//! - 1-based page and row access with append-at-end
//! - Page count consistency across fields
//! - Loading and saving whole datasets

mod store_tests;

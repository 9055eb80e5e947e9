//! Integration tests for scalar kinds and value encoding
//!
//! These tests verify:
//! - Type codes, names and sizes
//! - Value conversion between kinds
//! - Single-value encode/decode in both modes

mod value_tests;

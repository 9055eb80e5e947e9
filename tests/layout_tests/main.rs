//! Integration tests for layouts and definitions
//!
//! These tests verify:
//! - Definition ordinals and per-kind name uniqueness
//! - Definition checks and transfers between layouts
//! - Tuple form of definitions

mod definition_tests;

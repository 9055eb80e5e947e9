//! Integration tests for contexts and the handle registry
//!
//! These tests verify:
//! - Lowest-free and explicit index assignment
//! - Index release on terminate and drop
//! - Exhaustion and range errors

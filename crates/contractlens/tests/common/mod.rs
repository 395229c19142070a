//! Shared test utilities for contractlens integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a `ContractService` to temp storage and an in-memory database
//! - `MockGenerator`, a scripted stand-in for the generation service

pub mod harness;

pub use harness::*;

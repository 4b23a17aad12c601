//! Integration tests for the Kadstats analyzer.
//!
//! These tests drive the HTTP client and the full ingest/aggregate pipeline
//! against a mock Kademlia API.

mod common;
mod kademlia_tests;
mod pipeline_tests;

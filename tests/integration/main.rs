//! Integration tests for kb-harvester
//!
//! These tests run full harvests against wiremock servers and inspect the
//! artifact and image store written into temporary directories.

mod harvest_tests;

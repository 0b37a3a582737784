//! Integration tests for the harvester
//!
//! `harvest_tests` drives the orchestrator against a scripted archive;
//! `http_tests` runs complete harvests against a wiremock server.

mod harvest_tests;
mod http_tests;

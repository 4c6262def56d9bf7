//! Episodex - anime library reconciliation
//!
//! Matches local files to canonical AniList media and normalizes their
//! episode numbers. The library crate exposes the scanner, the catalog
//! clients and configuration for the binary and integration tests.

pub mod catalog;
pub mod config;
pub mod scanner;

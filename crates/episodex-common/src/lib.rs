//! Episodex-Common: Shared types, identifiers, and errors.
//!
//! This crate provides common functionality used across episodex:
//!
//! - **Typed IDs**: [`MediaId`] for catalog records, [`ScanId`] for scan runs
//! - **Catalog Types**: Canonical media records, relation edges, episode maps
//! - **Error Handling**: The scan error taxonomy and a result alias
//!
//! # Examples
//!
//! ```
//! use episodex_common::{Error, MediaFormat, MediaId, Result};
//!
//! let id = MediaId::new(21);
//! assert!(!id.is_unmatched());
//! assert!(MediaId::UNMATCHED.is_unmatched());
//!
//! assert_eq!(MediaFormat::Movie.to_string(), "movie");
//!
//! fn example() -> Result<()> {
//!     Err(Error::NoCandidates)
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;

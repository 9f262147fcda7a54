//! # squad-id
//!
//! Identifier types shared by the squad assignment crates.
//!
//! ## Design Principles
//!
//! - Squads and assignments get system-generated IDs; members arrive with
//!   whatever identifier the host application issued
//! - Every ID has one canonical string form with strict parsing
//! - IDs are typed so a squad ID can never be bound where a member ID is expected
//!
//! ## ID Format
//!
//! Generated IDs use a prefixed format: `{prefix}_{ulid}`
//!
//! Examples:
//! - `sqd_01HV4Z2WQXKJNM8GPQY6VBKC3D`
//! - `asgn_01HV4Z3MXNKPQR9HSTZ7WCLD4E`
//!
//! Member IDs are opaque strings (trimmed, non-empty, bounded length).

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

// Path used by `define_id!` expansions in downstream crates.
#[doc(hidden)]
pub use ulid::Ulid;

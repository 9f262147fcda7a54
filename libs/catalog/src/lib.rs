//! # squad-catalog
//!
//! Static catalog of squad templates and their positions.
//!
//! A squad follows one of two fixed shapes, picked from the member's birth
//! year. Each shape is a list of slots, and every slot pairs a canonical
//! [`PositionKey`] with a jersey number. Within one template both the key and
//! the jersey number are unique.
//!
//! Position labels typed by humans ("Sağ Bek", "kaleci̇", "GK") are resolved to
//! canonical keys by [`normalize_position_key`]. Resolution is strict: an
//! unknown label is an error, never a silent default.
//!
//! Nothing in this crate performs I/O.

mod alias;
mod error;
mod position;
mod template;

pub use alias::{fold_label, normalize_position_key, Alias, ALIASES};
pub use error::CatalogError;
pub use position::{
    jersey_number_for, positions_for_template, validate_position_for_template, PositionKey, Slot,
};
pub use template::{template_for_birth_year, AgeGroupCode, Template};

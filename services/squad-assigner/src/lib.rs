//! Squad auto-assignment service library.
//!
//! Places newly activated members into age-group squads. The crate ships a
//! `squad-assigner` operator binary and exposes its library surface for the
//! queue consumer and integration tests.

pub mod assign;
pub mod config;
pub mod context;
pub mod db;
pub mod intake;
pub mod model;
pub mod ranking;
pub mod roster;
pub mod store;

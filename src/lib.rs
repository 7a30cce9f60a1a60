//! Strata: modal editing where modes are stacked into towers.
//!
//! Each [`editor::Surface`] is governed by a [`editor::Tower`], an ordered stack
//! of modes registered in the [`editor::Registry`]. The [`editor::Editor`] moves
//! surfaces up and down their towers, remembers the level left for a detour,
//! and lets a tower be edited as text in a meta session.

pub mod config;
pub mod editor;
pub mod error;
pub mod ui;

pub use error::{Error, Result};

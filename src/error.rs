//! Error types for Strata

use thiserror::Error;

use crate::editor::SurfaceId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("mode not found: {0}")]
    ModeNotFound(String),

    #[error("surface not found: {0}")]
    SurfaceNotFound(SurfaceId),

    #[error("no surface is open")]
    NoSurface,

    #[error("complex not found: {0}")]
    ComplexNotFound(String),

    #[error("surface {0} does not belong to a complex")]
    NoComplex(SurfaceId),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid tower: {0}")]
    InvalidTower(#[from] TowerError),

    #[error("a meta session is already active")]
    MetaSessionActive,

    #[error("no meta session is active")]
    NoMetaSession,

    #[error("surface {0} is not a tower view")]
    NotATowerView(SurfaceId),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Problems found while reading a textual tower listing.
///
/// Line numbers are 1-based, counted over the raw text including blank lines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: expected `<level> | <mode>`, found `{text}`")]
    Malformed { line: usize, text: String },

    #[error("line {line}: unparsable level marker `{marker}`")]
    BadLevel { line: usize, marker: String },

    #[error("line {line}: missing mode name")]
    MissingName { line: usize },

    #[error("line {line}: invalid mode name `{name}`")]
    InvalidName { line: usize, name: String },

    #[error("line {line}: duplicate mode `{name}`")]
    DuplicateName { line: usize, name: String },

    #[error("line {line}: `{name}` is a second default (already `{previous}`)")]
    MultipleDefaults {
        line: usize,
        name: String,
        previous: String,
    },

    #[error("line {line}: unknown mode `{name}`")]
    UnknownMode { line: usize, name: String },

    #[error("tower has no levels")]
    Empty,
}

/// Invariant violations when a tower is built or modified programmatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TowerError {
    #[error("tower `{tower}` has no levels")]
    Empty { tower: String },

    #[error("tower `{tower}` lists `{name}` more than once")]
    DuplicateMember { tower: String, name: String },

    #[error("tower `{tower}` default `{name}` is not one of its levels")]
    UnknownDefault { tower: String, name: String },

    #[error("tower `{tower}` cannot hold a level named `{name}`")]
    InvalidMemberName { tower: String, name: String },

    #[error("tower `{tower}` has no level named `{name}`")]
    MemberNotFound { tower: String, name: String },

    #[error("complex `{complex}` holds more than one tower named `{name}`")]
    DuplicateTower { complex: String, name: String },

    #[error("complex `{complex}` has no tower named `{name}`")]
    TowerNotFound { complex: String, name: String },
}

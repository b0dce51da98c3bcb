//! Error types for the turn simulation.
//!
//! Only exceptional conditions are errors. A turn whose order cannot achieve
//! its intent still resolves; see [`crate::resolution::MoveOutcome`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Kind of record a [`GameError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// A match.
    Match,
    /// A participant seat.
    Participant,
    /// A turn record.
    Turn,
    /// A unit.
    Unit,
    /// A unit type.
    UnitType,
    /// A kingdom.
    Kingdom,
    /// A land.
    Land,
    /// A province.
    Province,
    /// A generated chunk.
    Chunk,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Match => "match",
            Self::Participant => "participant",
            Self::Turn => "turn",
            Self::Unit => "unit",
            Self::UnitType => "unit type",
            Self::Kingdom => "kingdom",
            Self::Land => "land",
            Self::Province => "province",
            Self::Chunk => "chunk",
        };
        f.write_str(name)
    }
}

/// Why a request conflicts with the current turn state.
///
/// Each variant carries enough state for the caller to retry sensibly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictReason {
    /// The requested turn is beyond the currently unlockable maximum.
    TurnNotAvailable {
        /// Turn that was requested.
        turn: u32,
        /// Highest turn currently unlockable.
        max_turn: u32,
    },
    /// The turn has already been resolved and accepts no further changes.
    TurnAlreadyResolved {
        /// Turn that was requested.
        turn: u32,
    },
    /// A resolution attempt did not advance the participant's counter.
    NoProgress {
        /// Turn that was being resolved.
        turn: u32,
        /// Counter value observed after the attempt.
        last_resolved_turn: u32,
    },
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnNotAvailable { turn, max_turn } => {
                write!(f, "turn {turn} not available yet (max_turn {max_turn})")
            }
            Self::TurnAlreadyResolved { turn } => write!(f, "turn {turn} is already resolved"),
            Self::NoProgress {
                turn,
                last_resolved_turn,
            } => write!(
                f,
                "turn {turn} could not be resolved (last_resolved_turn {last_resolved_turn})"
            ),
        }
    }
}

/// Top-level error type for all turn simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Malformed input, rejected before anything is persisted.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind of record.
        kind: RecordKind,
        /// Identifier that was looked up, rendered for display.
        id: String,
    },

    /// The request conflicts with the current turn state.
    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    /// The backing store failed.
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Encoding or decoding a record failed.
    #[error("Serialization failure: {0}")]
    Serialization(String),
}

impl GameError {
    /// Build a [`GameError::NotFound`] for any displayable identifier.
    pub fn not_found(kind: RecordKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Build a [`GameError::Validation`] from a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns the conflict reason if this is a conflict error.
    #[must_use]
    pub const fn conflict(&self) -> Option<&ConflictReason> {
        match self {
            Self::Conflict(reason) => Some(reason),
            _ => None,
        }
    }
}

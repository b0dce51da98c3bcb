//! Axial hex coordinates and chunk addressing.

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Axial coordinates for a hex grid (q, r). The implicit cube coordinate is `s = -q - r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hex {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
}

impl Hex {
    /// The six axial neighbor offsets, in a fixed order.
    pub const DIRECTIONS: [Hex; 6] = [
        Hex { q: 1, r: 0 },  // East
        Hex { q: 1, r: -1 }, // Northeast
        Hex { q: 0, r: -1 }, // Northwest
        Hex { q: -1, r: 0 }, // West
        Hex { q: -1, r: 1 }, // Southwest
        Hex { q: 0, r: 1 },  // Southeast
    ];

    /// Create a hex from axial coordinates.
    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Implicit cube coordinate.
    #[inline]
    #[must_use]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    /// The six adjacent cells.
    #[must_use]
    pub fn neighbors(self) -> [Hex; 6] {
        Self::DIRECTIONS.map(|d| self + d)
    }

    /// Hex distance: `(|dq| + |dq + dr| + |dr|) / 2`.
    #[inline]
    #[must_use]
    pub fn distance(self, other: Hex) -> u32 {
        let dq = self.q - other.q;
        let dr = self.r - other.r;
        (dq.unsigned_abs() + (dq + dr).unsigned_abs() + dr.unsigned_abs()) / 2
    }

    /// Whether `other` is one of the six neighbors.
    #[must_use]
    pub fn is_adjacent(self, other: Hex) -> bool {
        self.distance(other) == 1
    }

    /// Chunk containing this cell for the given chunk size.
    ///
    /// Uses floor division so negative coordinates land in negative chunks.
    #[must_use]
    pub const fn chunk(self, chunk_size: u32) -> ChunkCoord {
        let size = chunk_size as i32;
        ChunkCoord {
            q: self.q.div_euclid(size),
            r: self.r.div_euclid(size),
        }
    }
}

impl Add for Hex {
    type Output = Hex;

    fn add(self, other: Hex) -> Hex {
        Hex {
            q: self.q + other.q,
            r: self.r + other.r,
        }
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

impl From<(i32, i32)> for Hex {
    fn from((q, r): (i32, i32)) -> Self {
        Self { q, r }
    }
}

/// Coordinate of a square chunk of the hex field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// Chunk column.
    pub q: i32,
    /// Chunk row.
    pub r: i32,
}

impl ChunkCoord {
    /// Create a chunk coordinate.
    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// First cell of the chunk (lowest q and r).
    ///
    /// Saturates at the edge of the `i32` field; use
    /// [`ChunkCoord::checked_origin`] before generating cells.
    #[must_use]
    pub const fn origin(self, chunk_size: u32) -> Hex {
        let size = chunk_size as i32;
        Hex {
            q: self.q.saturating_mul(size),
            r: self.r.saturating_mul(size),
        }
    }

    /// First cell of the chunk, or `None` if a chunk of `chunk_size` plus
    /// its one-cell border would fall outside the `i32` field.
    #[must_use]
    pub fn checked_origin(self, chunk_size: u32) -> Option<Hex> {
        let size = i32::try_from(chunk_size).ok().filter(|s| *s > 0)?;
        let q = self.q.checked_mul(size)?;
        let r = self.r.checked_mul(size)?;
        for start in [q, r] {
            start.checked_sub(1)?;
            start.checked_add(size)?;
        }
        Some(Hex { q, r })
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

/// Raw key bytes. Keys are non-empty and ordered byte-lexicographically.
pub type Key = Vec<u8>;

/// Raw value bytes. Values are opaque and may be empty.
pub type Value = Vec<u8>;

/// Direction of a cursor over the ordered key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Increasing byte-lexicographic key order.
    Ascending,
    /// Decreasing byte-lexicographic key order.
    Descending,
}

impl Direction {
    /// Reversed direction.
    pub fn reversed(self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }
}

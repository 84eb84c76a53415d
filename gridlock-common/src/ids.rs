//! Lane and quadrant identifiers.
//!
//! Lanes are compass-indexed (N/S/E/W); quadrants are the four geometric
//! quarters of the intersection (NE/NW/SW/SE). Both are fixed at exactly
//! four instances — there is no runtime flexibility in either count.

/// Number of lanes in the intersection. Fixed.
pub const NUM_LANES: usize = 4;

/// Number of quadrants in the intersection. Fixed.
pub const NUM_QUADRANTS: usize = 4;

/// Compass-indexed lane identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LaneId {
    /// North approach, index 0.
    North = 0,
    /// South approach, index 1.
    South = 1,
    /// East approach, index 2.
    East = 2,
    /// West approach, index 3.
    West = 3,
}

impl LaneId {
    /// All four lanes in fixed compass order.
    pub const ALL: [LaneId; NUM_LANES] = [LaneId::North, LaneId::South, LaneId::East, LaneId::West];

    /// Convert to a dense array index.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Construct from a dense array index, returning `None` if out of range.
    #[inline]
    pub const fn from_index(idx: usize) -> Option<LaneId> {
        match idx {
            0 => Some(LaneId::North),
            1 => Some(LaneId::South),
            2 => Some(LaneId::East),
            3 => Some(LaneId::West),
            _ => None,
        }
    }
}

impl std::fmt::Display for LaneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LaneId::North => "N",
            LaneId::South => "S",
            LaneId::East => "E",
            LaneId::West => "W",
        };
        f.write_str(s)
    }
}

/// Quadrant identifier. NE=0, NW=1, SW=2, SE=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuadrantId {
    /// North-east quadrant, index 0.
    NE = 0,
    /// North-west quadrant, index 1.
    NW = 1,
    /// South-west quadrant, index 2.
    SW = 2,
    /// South-east quadrant, index 3.
    SE = 3,
}

impl QuadrantId {
    /// All four quadrants in fixed index order.
    pub const ALL: [QuadrantId; NUM_QUADRANTS] =
        [QuadrantId::NE, QuadrantId::NW, QuadrantId::SW, QuadrantId::SE];

    /// Convert to a dense array index.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for QuadrantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QuadrantId::NE => "NE",
            QuadrantId::NW => "NW",
            QuadrantId::SW => "SW",
            QuadrantId::SE => "SE",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_index_round_trip() {
        for lane in LaneId::ALL {
            assert_eq!(LaneId::from_index(lane.index()), Some(lane));
        }
    }

    #[test]
    fn lane_index_out_of_range() {
        assert_eq!(LaneId::from_index(4), None);
    }

    #[test]
    fn lane_display() {
        assert_eq!(LaneId::North.to_string(), "N");
        assert_eq!(LaneId::West.to_string(), "W");
    }

    #[test]
    fn quadrant_display() {
        assert_eq!(QuadrantId::NE.to_string(), "NE");
        assert_eq!(QuadrantId::SE.to_string(), "SE");
    }

    #[test]
    fn all_lanes_distinct_indices() {
        let indices: Vec<usize> = LaneId::ALL.iter().map(|l| l.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }
}

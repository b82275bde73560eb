use serde::{Deserialize, Serialize};

/// Category code exposed in grid projections: 0 = nature, 1 = built,
/// 2 = centrality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Nature,
    Built,
    Centrality,
}

impl Category {
    pub fn code(self) -> u8 {
        match self {
            Category::Nature => 0,
            Category::Built => 1,
            Category::Centrality => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Category::Nature),
            1 => Some(Category::Built),
            2 => Some(Category::Centrality),
            _ => None,
        }
    }
}

/// Inhabitant-density tier drawn when a cell is newly built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityTier {
    High,
    Medium,
    Low,
}

impl DensityTier {
    pub const ALL: [DensityTier; 3] = [DensityTier::High, DensityTier::Medium, DensityTier::Low];

    /// Index into the (high, medium, low) tuples of the run configuration.
    pub fn index(self) -> usize {
        match self {
            DensityTier::High => 0,
            DensityTier::Medium => 1,
            DensityTier::Low => 2,
        }
    }
}

/// One grid position. Exactly one of `nature`/`built` holds at all times;
/// `centrality` implies `built`; inhabitants live only on built cells.
#[derive(Debug, Clone)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
    pub nature: bool,
    pub built: bool,
    pub centrality: bool,
    pub inhabitants: f64,
}

impl Cell {
    pub fn new_nature(x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            nature: true,
            built: false,
            centrality: false,
            inhabitants: 0.0,
        }
    }

    pub fn category(&self) -> Category {
        if self.centrality {
            Category::Centrality
        } else if self.built {
            Category::Built
        } else {
            Category::Nature
        }
    }
}

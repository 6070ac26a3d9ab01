//! Options for the network reduction procedures.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BoundaryOption {
    /// Per unit impedance above which equivalent branches are dropped.
    EliminationThreshold(f64),
    KeepEquipment,
    KeepAnnotations,
}

/// The three-double option block of `BoundaryEquivalent`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundaryConfig([f64; 3]);

impl BoundaryConfig {
    pub fn new(options: impl IntoIterator<Item = BoundaryOption>) -> Self {
        let mut block = [0.0; 3];
        for option in options {
            match option {
                BoundaryOption::EliminationThreshold(pu) => block[0] = pu,
                BoundaryOption::KeepEquipment => block[1] = 1.0,
                BoundaryOption::KeepAnnotations => block[2] = 1.0,
            }
        }
        Self(block)
    }

    pub fn block(&self) -> [f64; 3] {
        self.0
    }
}

/// Branch types `MakeOutageList` may include. Combine with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutageTypeMask(u8);

impl OutageTypeMask {
    pub const LINE: OutageTypeMask = OutageTypeMask(1);
    pub const XFMR: OutageTypeMask = OutageTypeMask(1 << 1);
    pub const PHASE_SHIFTER: OutageTypeMask = OutageTypeMask(1 << 2);
    pub const XFMR3: OutageTypeMask = OutageTypeMask(1 << 3);
    pub const SWITCH: OutageTypeMask = OutageTypeMask(1 << 4);
    pub const ALL: OutageTypeMask = OutageTypeMask(0b1_1111);

    pub fn bits(self) -> i32 {
        i32::from(self.0)
    }

    pub fn contains(self, other: OutageTypeMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for OutageTypeMask {
    type Output = OutageTypeMask;

    fn bitor(self, rhs: OutageTypeMask) -> OutageTypeMask {
        OutageTypeMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for OutageTypeMask {
    fn bitor_assign(&mut self, rhs: OutageTypeMask) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for OutageTypeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#07b}", self.0)
    }
}

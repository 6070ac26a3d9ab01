//! # Fault analysis parameters and results
//!
//! Parameter blocks for `DoFault`, `DoSteppedEvent` and the network reduction
//! procedures, plus the result shapes the short circuit queries return. The
//! blocks are plain data; [`crate::Session`] encodes and sends them.

pub mod config;
pub mod network;
pub mod stepped;

pub use config::{FaultConfig, FaultConn, FaultOption, OutageOption, Outages};
pub use network::{BoundaryConfig, BoundaryOption, OutageTypeMask};
pub use stepped::{RelayFamily, SteppedEvent, SteppedEventConfig, SteppedEventOption};

use serde::{Deserialize, Serialize};

use crate::phasor::Phasor;

/// Which fault result `PickFault` selects. The codes go to the engine as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultIndex {
    First,
    Next,
    Previous,
    Last,
    /// 1-based position in the result list.
    At(i32),
}

impl FaultIndex {
    pub fn code(self) -> i32 {
        match self {
            FaultIndex::First => 1,
            FaultIndex::Next => -2,
            FaultIndex::Previous => -4,
            FaultIndex::Last => -1,
            FaultIndex::At(n) => n,
        }
    }
}

/// Output layout of the short circuit queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScStyle {
    /// Sequence values (0, 1, 2), real and imaginary parts.
    SequenceRect,
    /// Sequence values, magnitude and angle.
    SequencePolar,
    /// Phase values (A, B, C), real and imaginary parts.
    PhaseRect,
    PhasePolar,
}

impl ScStyle {
    pub fn code(self) -> i32 {
        match self {
            ScStyle::SequenceRect => 1,
            ScStyle::SequencePolar => 2,
            ScStyle::PhaseRect => 3,
            ScStyle::PhasePolar => 4,
        }
    }

    pub fn is_polar(self) -> bool {
        matches!(self, ScStyle::SequencePolar | ScStyle::PhasePolar)
    }
}

/// Raw short circuit output: `out1[i]` and `out2[i]` are the two components
/// of value `i` in the requested [`ScStyle`]. Buses fill three values;
/// branches add one triple per terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct ScValues {
    pub style: ScStyle,
    pub out1: Vec<f64>,
    pub out2: Vec<f64>,
}

impl ScValues {
    pub fn phasor(&self, i: usize) -> Option<Phasor> {
        let (a, b) = (*self.out1.get(i)?, *self.out2.get(i)?);
        Some(if self.style.is_polar() {
            Phasor::new(a, b)
        } else {
            Phasor::from_rect(a, b)
        })
    }

    /// The first triple as phasors.
    pub fn triple(&self) -> Option<[Phasor; 3]> {
        Some([self.phasor(0)?, self.phasor(1)?, self.phasor(2)?])
    }
}

/// Currents and voltages seen by a relay for `ComputeRelayTime`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RelayTimeInputs {
    pub ia: Phasor,
    pub ib: Phasor,
    pub ic: Phasor,
    /// Neutral currents of the primary and secondary windings, if any.
    pub in1: Phasor,
    pub in2: Phasor,
    pub va: Phasor,
    pub vb: Phasor,
    pub vc: Phasor,
    /// Pre-fault voltage.
    pub vpre: Phasor,
}

impl RelayTimeInputs {
    pub(crate) fn currents(&self) -> [Phasor; 5] {
        [self.ia, self.ib, self.ic, self.in1, self.in2]
    }

    pub(crate) fn voltages(&self) -> [Phasor; 3] {
        [self.va, self.vb, self.vc]
    }
}

/// Relay operating time and the engine's description of the operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayOperation {
    pub time: f64,
    pub text: String,
}

use serde::{Deserialize, Serialize};

use crate::data::Handle;

/// Fault connection. Each maps to one slot of the `DoFault` connection
/// block and to a stepped event connection code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultConn {
    /// Three phase.
    ABC,
    /// Two phase to ground.
    ABG,
    /// Single phase to ground.
    AG,
    /// Phase to phase.
    AB,
}

impl FaultConn {
    pub(crate) fn slot(self) -> usize {
        match self {
            FaultConn::ABC => 0,
            FaultConn::ABG => 1,
            FaultConn::AG => 2,
            FaultConn::AB => 3,
        }
    }

    pub(crate) fn stepped_code(self) -> f64 {
        match self {
            FaultConn::ABC => 1.0,
            FaultConn::ABG => 4.0,
            FaultConn::AG => 5.0,
            FaultConn::AB => 8.0,
        }
    }
}

/// How outages in the outage list are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutageOption {
    #[default]
    OneAtATime,
    TwoAtATime,
    AllAtOnce,
    BreakerFailure,
}

impl OutageOption {
    fn block(self) -> [i32; 4] {
        let mut block = [0; 4];
        let slot = match self {
            OutageOption::OneAtATime => 0,
            OutageOption::TwoAtATime => 1,
            OutageOption::AllAtOnce => 2,
            OutageOption::BreakerFailure => 3,
        };
        block[slot] = 1;
        block
    }
}

/// Outaged branches and how to apply them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Outages {
    pub list: Vec<Handle>,
    pub option: OutageOption,
}

impl Outages {
    pub fn new(list: Vec<Handle>, option: OutageOption) -> Self {
        Self { list, option }
    }
}

/// One adjustment to a [`FaultConfig`]. Options apply in order; a later one
/// overrides what an earlier one set in the same slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FaultOption {
    /// Replaces the connection set.
    Connections(Vec<FaultConn>),
    CloseIn,
    CloseInOutage(Outages),
    /// Close-in with the far end open.
    CloseInEndOpen,
    CloseInEndOpenOutage(Outages),
    RemoteBus,
    RemoteBusOutage(Outages),
    LineEnd,
    LineEndOutage(Outages),
    /// Intermediate fault at the given percentage of the line.
    Intermediate(f64),
    IntermediateOutage(f64, Outages),
    IntermediateEndOpen(f64),
    IntermediateEndOpenOutage(f64, Outages),
    /// Intermediate faults from `from` to `to` percent in `step` increments.
    IntermediateAuto { step: f64, from: f64, to: f64 },
    /// Fault impedance in ohms.
    Impedance { r: f64, x: f64 },
    /// Drop the results of earlier runs.
    ClearPrevious(bool),
}

const CLOSE_IN: usize = 0;
const CLOSE_IN_OUTAGE: usize = 1;
const CLOSE_IN_END_OPEN: usize = 2;
const CLOSE_IN_END_OPEN_OUTAGE: usize = 3;
const REMOTE_BUS: usize = 4;
const REMOTE_BUS_OUTAGE: usize = 5;
const LINE_END: usize = 6;
const LINE_END_OUTAGE: usize = 7;
const INTERMEDIATE: usize = 8;
const INTERMEDIATE_OUTAGE: usize = 9;
const INTERMEDIATE_END_OPEN: usize = 10;
const INTERMEDIATE_END_OPEN_OUTAGE: usize = 11;
const AUTO_STEP: usize = INTERMEDIATE_OUTAGE;
const AUTO_FROM: usize = 12;
const AUTO_TO: usize = 13;

/// Parameter blocks for one `DoFault` run.
///
/// Built from [`FaultOption`]s and not changed afterwards; [`FaultConfig::with`]
/// consumes the config and returns the adjusted one.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultConfig {
    connections: [i32; 4],
    options: [f64; 15],
    outages: Vec<Handle>,
    outage_options: [i32; 4],
    r: f64,
    x: f64,
    clear_previous: bool,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            connections: [0; 4],
            options: [0.0; 15],
            outages: Vec::new(),
            outage_options: [0; 4],
            r: 0.0,
            x: 0.0,
            clear_previous: false,
        }
    }
}

impl FaultConfig {
    pub fn new(options: impl IntoIterator<Item = FaultOption>) -> Self {
        options.into_iter().fold(Self::default(), Self::with)
    }

    pub fn three_phase() -> Self {
        Self::new([FaultOption::Connections(vec![FaultConn::ABC])])
    }

    pub fn single_line_to_ground() -> Self {
        Self::new([FaultOption::Connections(vec![FaultConn::AG])])
    }

    pub fn with(mut self, option: FaultOption) -> Self {
        use FaultOption::*;
        match option {
            Connections(conns) => {
                self.connections = [0; 4];
                for conn in conns {
                    self.connections[conn.slot()] = 1;
                }
            }
            CloseIn => self.options[CLOSE_IN] = 1.0,
            CloseInOutage(o) => self.flag_with_outages(CLOSE_IN_OUTAGE, 1.0, o),
            CloseInEndOpen => self.options[CLOSE_IN_END_OPEN] = 1.0,
            CloseInEndOpenOutage(o) => self.flag_with_outages(CLOSE_IN_END_OPEN_OUTAGE, 1.0, o),
            RemoteBus => self.options[REMOTE_BUS] = 1.0,
            RemoteBusOutage(o) => self.flag_with_outages(REMOTE_BUS_OUTAGE, 1.0, o),
            LineEnd => self.options[LINE_END] = 1.0,
            LineEndOutage(o) => self.flag_with_outages(LINE_END_OUTAGE, 1.0, o),
            Intermediate(pct) => self.options[INTERMEDIATE] = pct,
            IntermediateOutage(pct, o) => self.flag_with_outages(INTERMEDIATE_OUTAGE, pct, o),
            IntermediateEndOpen(pct) => self.options[INTERMEDIATE_END_OPEN] = pct,
            IntermediateEndOpenOutage(pct, o) => {
                self.flag_with_outages(INTERMEDIATE_END_OPEN_OUTAGE, pct, o)
            }
            IntermediateAuto { step, from, to } => {
                self.options[AUTO_STEP] = step;
                self.options[AUTO_FROM] = from;
                self.options[AUTO_TO] = to;
            }
            Impedance { r, x } => {
                self.r = r;
                self.x = x;
            }
            ClearPrevious(clear) => self.clear_previous = clear,
        }
        self
    }

    fn flag_with_outages(&mut self, slot: usize, value: f64, outages: Outages) {
        self.options[slot] = value;
        self.outage_options = outages.option.block();
        self.outages = outages.list;
    }

    /// Connection block, 1 in each enabled slot (ABC, ABG, AG, AB).
    pub fn connections(&self) -> [i32; 4] {
        self.connections
    }

    pub fn options(&self) -> &[f64; 15] {
        &self.options
    }

    pub fn outages(&self) -> &[Handle] {
        &self.outages
    }

    pub fn outage_options(&self) -> [i32; 4] {
        self.outage_options
    }

    /// Fault resistance and reactance in ohms.
    pub fn impedance(&self) -> (f64, f64) {
        (self.r, self.x)
    }

    pub fn clear_previous(&self) -> bool {
        self.clear_previous
    }

    /// The outage list as the engine reads it: handles then a 0 terminator.
    pub(crate) fn outage_words(&self) -> Vec<i32> {
        self.outages.iter().map(|h| h.raw()).chain([0]).collect()
    }
}

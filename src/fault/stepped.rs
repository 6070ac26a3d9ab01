use serde::{Deserialize, Serialize};

use super::config::FaultConn;

const DEFAULT_TIERS: i32 = 3;

/// Relay families a stepped event run can evaluate, in the order of the
/// run option block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelayFamily {
    OvercurrentGround,
    OvercurrentPhase,
    DistanceGround,
    DistancePhase,
    LogicScheme,
    Voltage,
    Differential,
}

impl RelayFamily {
    pub const ALL: [RelayFamily; 7] = [
        RelayFamily::OvercurrentGround,
        RelayFamily::OvercurrentPhase,
        RelayFamily::DistanceGround,
        RelayFamily::DistancePhase,
        RelayFamily::LogicScheme,
        RelayFamily::Voltage,
        RelayFamily::Differential,
    ];

    fn slot(self) -> usize {
        match self {
            RelayFamily::OvercurrentGround => 0,
            RelayFamily::OvercurrentPhase => 1,
            RelayFamily::DistanceGround => 2,
            RelayFamily::DistancePhase => 3,
            RelayFamily::LogicScheme => 4,
            RelayFamily::Voltage => 5,
            RelayFamily::Differential => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SteppedEventOption {
    Connection(FaultConn),
    /// Same as an intermediate fault at 0%.
    CloseIn,
    Intermediate(f64),
    Impedance { r: f64, x: f64 },
    Relays(RelayFamily),
    AllRelays,
    /// How many tiers away from the faulted equipment to evaluate.
    Tiers(i32),
}

/// Parameter blocks for one `DoSteppedEvent` run.
#[derive(Debug, Clone, PartialEq)]
pub struct SteppedEventConfig {
    options: [f64; 64],
    relays: [i32; 7],
    tiers: i32,
}

impl Default for SteppedEventConfig {
    fn default() -> Self {
        Self {
            options: [0.0; 64],
            relays: [0; 7],
            tiers: DEFAULT_TIERS,
        }
    }
}

impl SteppedEventConfig {
    pub fn new(options: impl IntoIterator<Item = SteppedEventOption>) -> Self {
        options.into_iter().fold(Self::default(), Self::with)
    }

    pub fn with(mut self, option: SteppedEventOption) -> Self {
        match option {
            SteppedEventOption::Connection(conn) => self.options[0] = conn.stepped_code(),
            SteppedEventOption::CloseIn => self.options[1] = 0.0,
            SteppedEventOption::Intermediate(pct) => self.options[1] = pct,
            SteppedEventOption::Impedance { r, x } => {
                self.options[2] = r;
                self.options[3] = x;
            }
            SteppedEventOption::Relays(family) => self.relays[family.slot()] = 1,
            SteppedEventOption::AllRelays => self.relays = [1; 7],
            SteppedEventOption::Tiers(n) => self.tiers = n,
        }
        self
    }

    pub fn options(&self) -> &[f64; 64] {
        &self.options
    }

    /// Run option block, 1 for each enabled [`RelayFamily`].
    pub fn relays(&self) -> [i32; 7] {
        self.relays
    }

    pub fn tiers(&self) -> i32 {
        self.tiers
    }
}

/// One step of a stepped event result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SteppedEvent {
    pub step: i32,
    /// Set for steps the user defined rather than relay operations.
    pub user_event: bool,
    /// Seconds from fault inception.
    pub time: f64,
    pub current: f64,
    pub event_description: String,
    pub fault_description: String,
}

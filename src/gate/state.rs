use strum::Display;

use crate::error::{BridgeError, Result};

/// Which fault step a result query depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    #[strum(serialize = "fault not simulated")]
    Run,
    #[strum(serialize = "fault not picked")]
    Picked,
}

/// The engine's implicit fault-analysis state, mirrored on the bridge side.
///
/// `Picked` implies a run exists. Every transition happens while the call
/// gate's lock is held, together with the call that causes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum FaultState {
    #[default]
    NotRun,
    Run,
    Picked,
}

impl FaultState {
    pub fn is_run(self) -> bool {
        matches!(self, FaultState::Run | FaultState::Picked)
    }

    pub fn is_picked(self) -> bool {
        self == FaultState::Picked
    }

    /// Entered before every fault or stepped event run, whatever its outcome.
    pub fn begin_run(&mut self) {
        self.reset();
    }

    /// Drops any run, e.g. when the model it was computed on goes away.
    pub fn reset(&mut self) {
        *self = FaultState::NotRun;
    }

    pub fn finish_run(&mut self, ok: bool) {
        *self = if ok { FaultState::Run } else { FaultState::NotRun };
    }

    /// A failed pick leaves the run in place but nothing selected.
    pub fn finish_pick(&mut self, ok: bool) {
        debug_assert!(self.is_run());
        *self = if ok { FaultState::Picked } else { FaultState::Run };
    }

    pub fn require_run(self, operation: &'static str) -> Result<()> {
        if self.is_run() {
            Ok(())
        } else {
            Err(BridgeError::State {
                operation,
                required: Stage::Run,
            })
        }
    }

    /// Checks the run first, then the pick.
    pub fn require_picked(self, operation: &'static str) -> Result<()> {
        self.require_run(operation)?;
        if self.is_picked() {
            Ok(())
        } else {
            Err(BridgeError::State {
                operation,
                required: Stage::Picked,
            })
        }
    }
}

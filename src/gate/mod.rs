//! # Call gate
//!
//! The engine keeps global state and cannot be called concurrently or
//! reentrantly. [`CallGate`] owns the engine and puts every call behind one
//! lock. A failing call has its error text read from the side-channel before
//! the lock is released, so no other caller can overwrite it in between.
//!
//! The gate also owns the mirrored [`FaultState`]; state transitions are made
//! through an [`Invoker`] inside the same critical section as the call that
//! causes them.

mod state;

pub use state::{FaultState, Stage};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use crate::native::{Arg, Convention, NativeEngine, Procedure, FAILURE, SENTINEL};

/// Result of one native call as seen at the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<T> {
    Success(T),
    /// A "get next" procedure ran out of items.
    Exhausted,
    /// The engine reported failure; carries the side-channel message.
    Failure(String),
}

impl<T> CallOutcome<T> {
    /// `Ok(None)` for [`CallOutcome::Exhausted`].
    pub fn into_result(self, operation: &'static str) -> Result<Option<T>> {
        match self {
            CallOutcome::Success(v) => Ok(Some(v)),
            CallOutcome::Exhausted => Ok(None),
            CallOutcome::Failure(message) => Err(BridgeError::native(operation, message)),
        }
    }

    /// For procedures that never report exhaustion.
    pub fn require(self, operation: &'static str) -> Result<T> {
        self.into_result(operation)?
            .ok_or_else(|| BridgeError::native(operation, "unexpected end of sequence"))
    }
}

struct GateInner {
    engine: Box<dyn NativeEngine>,
    fault: FaultState,
    released: bool,
}

pub struct CallGate {
    inner: Mutex<GateInner>,
}

impl CallGate {
    pub fn new(engine: Box<dyn NativeEngine>) -> Self {
        Self {
            inner: Mutex::new(GateInner {
                engine,
                fault: FaultState::default(),
                released: false,
            }),
        }
    }

    /// Runs `f` with exclusive access to the engine.
    ///
    /// # Panics
    ///
    /// If the gate has been released.
    pub fn exclusive<R>(&self, f: impl FnOnce(&mut Invoker<'_>) -> R) -> R {
        let mut inner = self.inner.lock();
        assert!(!inner.released, "native engine used after release");
        f(&mut Invoker { inner: &mut inner })
    }

    pub fn invoke(&self, procedure: Procedure, args: &mut [Arg<'_>]) -> CallOutcome<i32> {
        self.exclusive(|inv| inv.invoke(procedure, args))
    }

    pub fn invoke_text(&self, procedure: Procedure, args: &mut [Arg<'_>]) -> String {
        self.exclusive(|inv| inv.invoke_text(procedure, args))
    }

    pub fn fault_state(&self) -> FaultState {
        self.inner.lock().fault
    }

    pub fn is_released(&self) -> bool {
        self.inner.lock().released
    }

    /// Unloads the engine. Later calls are no-ops apart from a warning.
    pub fn release(&self) {
        let mut inner = self.inner.lock();
        if inner.released {
            warn!("native engine already released");
            return;
        }
        inner.engine.release();
        inner.released = true;
        inner.fault = FaultState::NotRun;
        info!("native engine released");
    }
}

impl Drop for CallGate {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if !inner.released {
            inner.engine.release();
            inner.released = true;
            info!("native engine released on drop");
        }
    }
}

/// Engine access inside one critical section of the [`CallGate`].
pub struct Invoker<'g> {
    inner: &'g mut GateInner,
}

impl Invoker<'_> {
    pub fn invoke(&mut self, procedure: Procedure, args: &mut [Arg<'_>]) -> CallOutcome<i32> {
        debug!(procedure = procedure.name(), "native call");
        let rc = self.inner.engine.invoke(procedure, args);
        match (procedure.convention(), rc) {
            (Convention::Sentinel, SENTINEL) => CallOutcome::Exhausted,
            (_, FAILURE) => {
                let message = self.error_string();
                warn!(procedure = procedure.name(), %message, "native call failed");
                CallOutcome::Failure(message)
            }
            (_, rc) => CallOutcome::Success(rc),
        }
    }

    pub fn invoke_text(&mut self, procedure: Procedure, args: &mut [Arg<'_>]) -> String {
        debug!(procedure = procedure.name(), "native call");
        self.inner.engine.invoke_text(procedure, args)
    }

    fn error_string(&mut self) -> String {
        self.inner
            .engine
            .invoke_text(Procedure::ErrorString, &mut [])
            .trim()
            .to_string()
    }

    pub fn fault(&self) -> FaultState {
        self.inner.fault
    }

    pub fn fault_mut(&mut self) -> &mut FaultState {
        &mut self.inner.fault
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::native::SimulatedEngine;

    fn gate() -> (CallGate, crate::native::simulated::SimProbe) {
        let sim = SimulatedEngine::sample();
        let probe = sim.probe();
        (CallGate::new(Box::new(sim)), probe)
    }

    #[test]
    fn test_failure_reads_side_channel_under_lock() {
        let (gate, probe) = gate();
        let outcome = gate.invoke(Procedure::FindBusNo, &mut [Arg::Int(99)]);
        assert_eq!(
            outcome,
            CallOutcome::Failure("Bus number 99 not found".to_string())
        );
        assert_eq!(probe.count(Procedure::ErrorString), 1);
    }

    #[test]
    fn test_sentinel_is_exhaustion() {
        let (gate, _) = gate();
        let mut hnd = [0u8; 4];
        let outcome = gate.invoke(
            Procedure::GetEquipment,
            &mut [Arg::Int(crate::data::EquipmentType::SWITCH.0), Arg::Out(&mut hnd)],
        );
        assert_eq!(outcome, CallOutcome::Exhausted);
        assert_eq!(outcome.into_result("GetEquipment"), Ok(None));
    }

    #[test]
    fn test_value_convention() {
        let (gate, _) = gate();
        let outcome = gate.invoke(Procedure::FindBusNo, &mut [Arg::Int(1)]);
        let CallOutcome::Success(hnd) = outcome else {
            panic!("expected a handle, got {outcome:?}");
        };
        let kind = gate.invoke(Procedure::EquipmentType, &mut [Arg::Int(hnd)]);
        assert_eq!(kind.require("EquipmentType"), Ok(1));
    }

    #[test]
    fn test_exclusive_spans_several_calls() {
        let (gate, probe) = gate();
        let names = gate.exclusive(|inv| {
            let mut out = Vec::new();
            for n in [1, 2] {
                let CallOutcome::Success(h) = inv.invoke(Procedure::FindBusNo, &mut [Arg::Int(n)]) else {
                    continue;
                };
                out.push(inv.invoke_text(Procedure::FullBusName, &mut [Arg::Int(h)]));
            }
            out
        });
        assert_eq!(names, vec!["NEVADA 132kV", "OHIO 132kV"]);
        assert_eq!(probe.total(), 4);
    }

    #[test]
    fn test_release_is_idempotent() {
        let (gate, _) = gate();
        gate.release();
        gate.release();
        assert!(gate.is_released());
        assert_eq!(gate.fault_state(), FaultState::NotRun);
    }

    #[test]
    fn test_engine_released_exactly_once() {
        let (dropped, probe) = gate();
        drop(dropped);
        assert_eq!(probe.releases(), 1);

        let (released, probe) = gate();
        released.release();
        released.release();
        drop(released);
        assert_eq!(probe.releases(), 1);
    }

    #[test]
    #[should_panic(expected = "after release")]
    fn test_call_after_release_panics() {
        let (gate, _) = gate();
        gate.release();
        gate.invoke(Procedure::FindBusNo, &mut [Arg::Int(1)]);
    }
}

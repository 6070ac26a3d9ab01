use tracing::info;

use super::Session;
use crate::codec;
use crate::cursor::{FaultCursor, SteppedEventCursor};
use crate::data::Handle;
use crate::error::{BridgeError, Result};
use crate::fault::{FaultConfig, FaultIndex, ScStyle, ScValues, SteppedEvent, SteppedEventConfig};
use crate::gate::CallOutcome;
use crate::native::{Arg, Procedure};
use crate::phasor::Phasor;

const SC_VOLTAGE_VALUES: usize = 9;
const SC_CURRENT_VALUES: usize = 12;

impl Session {
    /// Runs the faults described by `config` on `handle`.
    ///
    /// Any earlier run and pick are dropped first, so a failed run leaves
    /// nothing to query.
    pub fn do_fault(&self, handle: Handle, config: &FaultConfig) -> Result<()> {
        let connections = codec::encode_i32_array(&config.connections());
        let options = codec::encode_f64_array(config.options());
        let outage_options = codec::encode_i32_array(&config.outage_options());
        let outages = codec::encode_i32_array(&config.outage_words());
        let (r, x) = config.impedance();
        let [r_lo, r_hi] = Arg::double(r);
        let [x_lo, x_hi] = Arg::double(x);
        let mut args = [
            Arg::Int(handle.raw()),
            Arg::In(&connections),
            Arg::In(&options),
            Arg::In(&outage_options),
            Arg::In(&outages),
            r_lo,
            r_hi,
            x_lo,
            x_hi,
            Arg::flag(config.clear_previous()),
        ];
        self.run(Procedure::DoFault, &mut args)?;
        info!(%handle, outages = config.outages().len(), "fault simulated");
        Ok(())
    }

    /// Runs a stepped event on `handle`.
    ///
    /// Like [`Session::do_fault`], this replaces any earlier run. The steps
    /// are read back with [`Session::stepped_event`] or
    /// [`Session::next_stepped_event`].
    pub fn do_stepped_event(&self, handle: Handle, config: &SteppedEventConfig) -> Result<()> {
        let options = codec::encode_f64_array(config.options());
        let relays = codec::encode_i32_array(&config.relays());
        self.run(
            Procedure::DoSteppedEvent,
            &mut [
                Arg::Int(handle.raw()),
                Arg::In(&options),
                Arg::In(&relays),
                Arg::Int(config.tiers()),
            ],
        )?;
        info!(%handle, tiers = config.tiers(), "stepped event simulated");
        Ok(())
    }

    fn run(&self, procedure: Procedure, args: &mut [Arg<'_>]) -> Result<()> {
        self.gate.exclusive(|inv| -> Result<()> {
            inv.fault_mut().begin_run();
            let outcome = inv.invoke(procedure, args);
            inv.fault_mut().finish_run(matches!(outcome, CallOutcome::Success(_)));
            outcome.require(procedure.name()).map(drop)
        })
    }

    /// Description of the `index`-th (1-based) result of the last run.
    pub fn fault_description(&self, index: i32) -> Result<String> {
        let text = self.checked_text(
            Procedure::FaultDescriptionEx,
            &mut [Arg::Int(index), Arg::Int(0)],
        )?;
        Ok(text.trim().to_string())
    }

    /// Selects the fault result the short circuit queries report on.
    ///
    /// Fails without calling the engine when no run exists. A failed pick
    /// leaves the run in place with nothing picked.
    pub fn pick_fault(&self, index: FaultIndex, tiers: i32) -> Result<()> {
        let op = Procedure::PickFault.name();
        self.gate.exclusive(|inv| -> Result<()> {
            inv.fault().require_run(op)?;
            let outcome = inv.invoke(
                Procedure::PickFault,
                &mut [Arg::Int(index.code()), Arg::Int(tiers)],
            );
            inv.fault_mut().finish_pick(matches!(outcome, CallOutcome::Success(_)));
            outcome.require(op).map(drop)
        })
    }

    /// Picks each result of the last run in order.
    pub fn next_fault(&self, tiers: i32) -> FaultCursor {
        let session = self.clone();
        FaultCursor::new(move |i| session.pick_fault(FaultIndex::At(i), tiers))
    }

    /// One step of the last stepped event run, 1-based.
    pub fn stepped_event(&self, step: i32) -> Result<SteppedEvent> {
        let mut time = [0u8; codec::DOUBLE_SIZE];
        let mut current = [0u8; codec::DOUBLE_SIZE];
        let mut user_event = [0u8; codec::INT_SIZE];
        let mut event_description = vec![0u8; codec::EVENT_DESC_LEN];
        let mut fault_description = vec![0u8; codec::FAULT_DESC_LEN];
        self.status(
            Procedure::GetSteppedEvent,
            &mut [
                Arg::Int(step),
                Arg::Out(&mut time),
                Arg::Out(&mut current),
                Arg::Out(&mut user_event),
                Arg::Out(&mut event_description),
                Arg::Out(&mut fault_description),
            ],
        )?;
        Ok(SteppedEvent {
            step,
            user_event: codec::decode_i32(&user_event) != 0,
            time: codec::decode_f64(&time),
            current: codec::decode_f64(&current),
            event_description: codec::decode_str(&event_description),
            fault_description: codec::decode_str(&fault_description),
        })
    }

    pub fn next_stepped_event(&self) -> SteppedEventCursor {
        let session = self.clone();
        SteppedEventCursor::new(move |step| session.stepped_event(step))
    }

    /// Pre-fault bus voltage in kV, phases A, B, C.
    pub fn psc_voltage_kv(&self, bus: Handle) -> Result<[Phasor; 3]> {
        self.psc_voltage(bus, 1)
    }

    /// Pre-fault bus voltage in per unit, phases A, B, C.
    pub fn psc_voltage_pu(&self, bus: Handle) -> Result<[Phasor; 3]> {
        self.psc_voltage(bus, 2)
    }

    fn psc_voltage(&self, bus: Handle, style: i32) -> Result<[Phasor; 3]> {
        let mut mag = [0u8; 3 * codec::DOUBLE_SIZE];
        let mut ang = [0u8; 3 * codec::DOUBLE_SIZE];
        self.status(
            Procedure::GetPSCVoltage,
            &mut [
                Arg::Int(bus.raw()),
                Arg::Out(&mut mag),
                Arg::Out(&mut ang),
                Arg::Int(style),
            ],
        )?;
        let (mag, ang) = (codec::decode_f64_array(&mag), codec::decode_f64_array(&ang));
        Ok([0, 1, 2].map(|i| Phasor::new(mag[i], ang[i])))
    }

    /// Voltages of the picked fault at `handle`: one triple for a bus, one per
    /// terminal for branch equipment.
    pub fn sc_voltage(&self, handle: Handle, style: ScStyle) -> Result<ScValues> {
        self.sc_query(Procedure::GetSCVoltage, handle, style, SC_VOLTAGE_VALUES)
    }

    /// Currents of the picked fault through `handle`. On
    /// [`Handle::SHORT_CIRCUIT`] this is the total fault current.
    pub fn sc_current(&self, handle: Handle, style: ScStyle) -> Result<ScValues> {
        self.sc_query(Procedure::GetSCCurrent, handle, style, SC_CURRENT_VALUES)
    }

    fn sc_query(&self, procedure: Procedure, handle: Handle, style: ScStyle, width: usize) -> Result<ScValues> {
        let op = procedure.name();
        let mut out1 = vec![0u8; width * codec::DOUBLE_SIZE];
        let mut out2 = vec![0u8; width * codec::DOUBLE_SIZE];
        self.gate.exclusive(|inv| -> Result<()> {
            inv.fault().require_picked(op)?;
            inv.invoke(
                procedure,
                &mut [
                    Arg::Int(handle.raw()),
                    Arg::Out(&mut out1),
                    Arg::Out(&mut out2),
                    Arg::Int(style.code()),
                ],
            )
            .require(op)
            .map(drop)
        })?;
        Ok(ScValues {
            style,
            out1: codec::decode_f64_array(&out1),
            out2: codec::decode_f64_array(&out2),
        })
    }

    pub fn sc_voltage_phase(&self, handle: Handle) -> Result<[Phasor; 3]> {
        first_triple(self.sc_voltage(handle, ScStyle::PhaseRect)?)
    }

    pub fn sc_voltage_seq(&self, handle: Handle) -> Result<[Phasor; 3]> {
        first_triple(self.sc_voltage(handle, ScStyle::SequenceRect)?)
    }

    pub fn sc_current_phase(&self, handle: Handle) -> Result<[Phasor; 3]> {
        first_triple(self.sc_current(handle, ScStyle::PhaseRect)?)
    }

    pub fn sc_current_seq(&self, handle: Handle) -> Result<[Phasor; 3]> {
        first_triple(self.sc_current(handle, ScStyle::SequenceRect)?)
    }
}

fn first_triple(values: ScValues) -> Result<[Phasor; 3]> {
    values
        .triple()
        .ok_or_else(|| BridgeError::Encoding("short circuit output holds fewer than 3 values".into()))
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::data::ArrayLengths;
    use crate::fault::{FaultConn, FaultOption, RelayFamily, SteppedEventOption};
    use crate::gate::{FaultState, Stage};
    use crate::native::SimulatedEngine;

    fn session() -> (Session, crate::native::simulated::SimProbe) {
        let sim = SimulatedEngine::sample();
        let probe = sim.probe();
        (
            Session::with_engine(Box::new(sim), ArrayLengths::default()),
            probe,
        )
    }

    #[test]
    fn test_pick_before_run_never_calls_engine() {
        let (s, probe) = session();
        let err = s.pick_fault(FaultIndex::First, 9).unwrap_err();
        assert_eq!(
            err,
            BridgeError::State {
                operation: "PickFault",
                required: Stage::Run
            }
        );
        assert_eq!(probe.count(Procedure::PickFault), 0);
        assert_eq!(s.fault_state(), FaultState::NotRun);
    }

    #[test]
    fn test_run_pick_and_query() {
        let (s, _) = session();
        let bus = s.find_bus_no(1).unwrap();
        s.do_fault(bus, &FaultConfig::three_phase()).unwrap();
        assert_eq!(s.fault_state(), FaultState::Run);
        assert_eq!(s.fault_description(1).unwrap(), "1. Bus Fault on: NEVADA 132kV 3LG");

        let err = s.sc_current(Handle::SHORT_CIRCUIT, ScStyle::PhaseRect).unwrap_err();
        assert_eq!(err.to_string(), "GetSCCurrent: fault not picked");

        s.pick_fault(FaultIndex::First, 9).unwrap();
        assert_eq!(s.fault_state(), FaultState::Picked);
        let total = s.sc_current(Handle::SHORT_CIRCUIT, ScStyle::PhasePolar).unwrap();
        assert_eq!(total.out1.len(), SC_CURRENT_VALUES);
        assert!(total.out1[0] > 0.0);
        assert!(s.sc_current(bus, ScStyle::PhaseRect).unwrap_err().is_native());

        let v = s.sc_voltage(bus, ScStyle::SequencePolar).unwrap();
        assert_eq!(v.out1.len(), SC_VOLTAGE_VALUES);
    }

    #[test]
    fn test_failed_pick_keeps_run() {
        let (s, _) = session();
        let bus = s.find_bus_no(1).unwrap();
        s.do_fault(bus, &FaultConfig::three_phase()).unwrap();
        s.pick_fault(FaultIndex::Last, 9).unwrap();
        assert!(s.pick_fault(FaultIndex::Next, 9).unwrap_err().is_native());
        assert_eq!(s.fault_state(), FaultState::Run);
    }

    #[test]
    fn test_failed_run_resets_state() {
        let (s, _) = session();
        let bus = s.find_bus_no(1).unwrap();
        s.do_fault(bus, &FaultConfig::three_phase()).unwrap();
        s.pick_fault(FaultIndex::First, 9).unwrap();

        let err = s.do_fault(bus, &FaultConfig::default()).unwrap_err();
        assert!(err.is_native());
        assert_eq!(s.fault_state(), FaultState::NotRun);
    }

    #[test]
    fn test_loading_model_drops_results() {
        let (s, probe) = session();
        let bus = s.find_bus_no(1).unwrap();
        s.do_fault(bus, &FaultConfig::three_phase()).unwrap();
        s.load_data_file("SAMPLE.OLR").unwrap();
        assert_eq!(s.fault_state(), FaultState::NotRun);
        assert!(s.pick_fault(FaultIndex::First, 9).is_err());
        assert_eq!(probe.count(Procedure::PickFault), 0);
    }

    #[test]
    fn test_fault_cursor_walks_every_result() {
        let (s, _) = session();
        let bus = s.find_bus_no(1).unwrap();
        let cfg = FaultConfig::new([FaultOption::Connections(vec![FaultConn::ABC, FaultConn::AG])]);
        s.do_fault(bus, &cfg).unwrap();

        let mut cursor = s.next_fault(9);
        let picked: Vec<i32> = cursor.by_ref().collect();
        assert_eq!(picked, vec![1, 2]);
        assert!(cursor.is_done());
        assert!(cursor.error().is_none());

        cursor.reset();
        assert!(cursor.advance());
        assert_eq!(cursor.index(), Some(1));
        assert_eq!(s.fault_state(), FaultState::Picked);
    }

    #[test]
    fn test_fault_cursor_without_run_records_state_error() {
        let (s, _) = session();
        let mut cursor = s.next_fault(9);
        assert!(!cursor.advance());
        assert!(matches!(cursor.error(), Some(BridgeError::State { .. })));
    }

    #[test]
    fn test_stepped_event_steps() {
        let (s, _) = session();
        let bus = s.find_bus_no(1).unwrap();
        let cfg = SteppedEventConfig::new([
            SteppedEventOption::Connection(FaultConn::AG),
            SteppedEventOption::Relays(RelayFamily::OvercurrentGround),
            SteppedEventOption::Relays(RelayFamily::OvercurrentPhase),
        ]);
        s.do_stepped_event(bus, &cfg).unwrap();
        assert_eq!(s.fault_state(), FaultState::Run);

        let first = s.stepped_event(1).unwrap();
        assert!(first.user_event);
        assert_eq!(first.time, 0.0);
        assert!(first.fault_description.contains("NEVADA"));

        let steps: Vec<SteppedEvent> = s.next_stepped_event().collect();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2].step, 3);
        assert!(!steps[2].user_event);
        assert!(s.stepped_event(4).unwrap_err().is_native());
    }

    #[test]
    fn test_psc_voltage() {
        let (s, _) = session();
        let bus = s.find_bus_no(2).unwrap();
        let [a, _, _] = s.psc_voltage_pu(bus).unwrap();
        assert!((a.mag() - 1.0).abs() < 1e-12);
        let [a, _, _] = s.psc_voltage_kv(bus).unwrap();
        assert!((a.mag() - 132.0 / 3f64.sqrt()).abs() < 1e-9);
        assert!(s.psc_voltage_kv(Handle::SYSTEM).is_err());
    }
}

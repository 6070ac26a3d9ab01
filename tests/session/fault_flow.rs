use oneliner_bridge::fault::{FaultOption, OutageOption, OutageTypeMask, Outages};
use oneliner_bridge::gate::Stage;
use oneliner_bridge::native::Procedure;
use oneliner_bridge::phasor::phase_to_seq;
use oneliner_bridge::{BridgeError, FaultConfig, FaultIndex, FaultState, Handle, ScStyle};

use super::{nevada, sample};

#[test]
fn test_pick_is_refused_before_any_run() {
    let (session, probe) = sample();
    for index in [FaultIndex::First, FaultIndex::Next, FaultIndex::Last, FaultIndex::At(3)] {
        let err = session.pick_fault(index, 9).unwrap_err();
        assert_eq!(
            err,
            BridgeError::State {
                operation: "PickFault",
                required: Stage::Run
            }
        );
    }
    assert_eq!(probe.count(Procedure::PickFault), 0);
    assert_eq!(probe.total(), 0);
}

#[test]
fn test_sc_queries_check_run_then_pick() {
    let (session, probe) = sample();
    let bus = nevada(&session);

    let err = session.sc_voltage(bus, ScStyle::PhaseRect).unwrap_err();
    assert_eq!(err.to_string(), "GetSCVoltage: fault not simulated");

    session.do_fault(bus, &FaultConfig::three_phase()).unwrap();
    let err = session.sc_current(Handle::SHORT_CIRCUIT, ScStyle::PhaseRect).unwrap_err();
    assert_eq!(err.to_string(), "GetSCCurrent: fault not picked");
    assert_eq!(probe.count(Procedure::GetSCVoltage), 0);
    assert_eq!(probe.count(Procedure::GetSCCurrent), 0);

    session.pick_fault(FaultIndex::First, 9).unwrap();
    session.sc_voltage(bus, ScStyle::PhaseRect).unwrap();
    assert_eq!(probe.count(Procedure::GetSCVoltage), 1);
}

#[test]
fn test_bolted_three_phase_fault_is_positive_sequence_only() {
    let (session, _) = sample();
    let bus = nevada(&session);
    session.do_fault(bus, &FaultConfig::three_phase()).unwrap();
    session.pick_fault(FaultIndex::First, 9).unwrap();

    let [i0, i1, i2] = session.sc_current_seq(Handle::SHORT_CIRCUIT).unwrap();
    assert!(i0.mag() < 1e-6);
    assert!(i2.mag() < 1e-6);
    assert!(i1.mag() > 0.0);

    let [ia, ib, ic] = session.sc_current_phase(Handle::SHORT_CIRCUIT).unwrap();
    for p in [ib, ic] {
        assert!((p.mag() - ia.mag()).abs() < 1e-6 * ia.mag());
    }
    let spread = (ia.ang() - ib.ang()).rem_euclid(360.0);
    assert!((spread - 120.0).abs() < 1e-6);

    let (s0, s1, s2) = phase_to_seq(ia, ib, ic);
    assert!(s0.mag() < 1e-6 && s2.mag() < 1e-6);
    assert!((s1.mag() - i1.mag()).abs() < 1e-6 * i1.mag());
}

#[test]
fn test_fault_impedance_lowers_current() {
    let (session, _) = sample();
    let bus = nevada(&session);
    let total = |cfg: FaultConfig| {
        session.do_fault(bus, &cfg).unwrap();
        session.pick_fault(FaultIndex::Last, 9).unwrap();
        session.sc_current_seq(Handle::SHORT_CIRCUIT).unwrap()[1].mag()
    };
    let bolted = total(FaultConfig::three_phase());
    let resistive = total(FaultConfig::three_phase().with(FaultOption::Impedance { r: 20.0, x: 0.0 }));
    assert!(resistive < bolted);
}

#[test]
fn test_every_run_drops_the_previous_pick() {
    let (session, _) = sample();
    let bus = nevada(&session);
    let single = FaultConfig::single_line_to_ground().with(FaultOption::ClearPrevious(true));

    session.do_fault(bus, &single).unwrap();
    session.pick_fault(FaultIndex::First, 9).unwrap();
    assert_eq!(session.fault_state(), FaultState::Picked);

    session.do_fault(bus, &single).unwrap();
    assert_eq!(session.fault_state(), FaultState::Run);
    let err = session.sc_voltage(bus, ScStyle::SequenceRect).unwrap_err();
    assert_eq!(err.to_string(), "GetSCVoltage: fault not picked");

    assert!(session.do_fault(Handle(9999), &single).is_err());
    assert_eq!(session.fault_state(), FaultState::NotRun);
    assert!(session.pick_fault(FaultIndex::First, 9).is_err());
}

#[test]
fn test_outage_list_feeds_fault_config() {
    let (session, _) = sample();
    let bus = nevada(&session);
    let outages = session.make_outage_list(bus, 1, OutageTypeMask::ALL).unwrap();
    assert!(!outages.is_empty());

    let cfg = FaultConfig::three_phase()
        .with(FaultOption::CloseInOutage(Outages::new(outages.clone(), OutageOption::AllAtOnce)));
    assert_eq!(cfg.outages(), outages.as_slice());
    session.do_fault(bus, &cfg).unwrap();

    let descriptions: Vec<String> = session
        .next_fault(9)
        .map(|i| session.fault_description(i).unwrap())
        .collect();
    assert_eq!(descriptions.len(), 1);
    assert!(descriptions[0].contains("NEVADA"));
}

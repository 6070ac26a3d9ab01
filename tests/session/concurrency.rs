use std::thread;
use std::time::Duration;

use oneliner_bridge::data::tokens::BUS_S_NAME;
use oneliner_bridge::native::SimulatedEngine;
use oneliner_bridge::{FaultConfig, FaultIndex, Handle, ScStyle, Session};

use super::{sample, session_over};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_session_is_shareable() {
    assert_send_sync::<Session>();
}

#[test]
fn test_calls_from_many_threads_never_overlap() {
    let sim = SimulatedEngine::sample().with_call_delay(Duration::from_millis(1));
    let (session, probe) = session_over(sim);

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let session = session.clone();
            thread::spawn(move || {
                for _ in 0..5 {
                    let bus = session.find_bus_no(1 + i % 2).unwrap();
                    let mut name = String::new();
                    session.get_data(bus, &[BUS_S_NAME]).scan(&mut [&mut name]).unwrap();
                    assert!(!name.is_empty());
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(probe.max_concurrent(), 1);
    assert!(probe.total() >= 80);
}

#[test]
fn test_fault_state_shared_across_clones() {
    let (session, _) = sample();
    let other = session.clone();
    let bus = session.find_bus_no(1).unwrap();

    thread::scope(|scope| {
        scope.spawn(|| {
            session.do_fault(bus, &FaultConfig::three_phase()).unwrap();
            session.pick_fault(FaultIndex::First, 9).unwrap();
        });
    });
    other.sc_current(Handle::SHORT_CIRCUIT, ScStyle::PhasePolar).unwrap();
}

#[test]
fn test_release_applies_to_every_clone() {
    let (session, probe) = sample();
    let other = session.clone();
    session.release();
    assert!(other.is_released());
    other.release();
    drop(session);
    drop(other);
    assert_eq!(probe.releases(), 1);
}

#[test]
#[should_panic(expected = "after release")]
fn test_use_after_release_panics() {
    let (session, _) = sample();
    session.release();
    let _ = session.find_bus_no(1);
}

#[test]
fn test_tracing_can_be_installed_by_tests() {
    oneliner_bridge::telemetry::try_init_tracing();
    let (session, _) = sample();
    assert!(session.find_bus_no(42).is_err());
}

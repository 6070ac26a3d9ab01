use oneliner_bridge::native::{Procedure, SimulatedEngine};
use oneliner_bridge::EquipmentType;
use rstest::rstest;

use super::{sample, session_over};

#[rstest]
#[case(0)]
#[case(1)]
#[case(7)]
fn test_bus_cursor_yields_every_bus(#[case] n: i32) {
    let mut sim = SimulatedEngine::new();
    for i in 1..=n {
        sim.add_bus(&format!("B{i}"), 69.0, i);
    }
    let (session, probe) = session_over(sim);

    let mut cursor = session.next_equipment(EquipmentType::BUS);
    let mut seen = Vec::new();
    while cursor.advance() {
        seen.push(cursor.current().unwrap());
    }
    assert_eq!(seen.len(), n as usize);
    assert!(cursor.error().is_none());
    assert!(cursor.current().is_none());

    // One call per item plus the one that hit the sentinel.
    assert_eq!(probe.count(Procedure::GetEquipment), n as usize + 1);
    assert!(!cursor.advance());
    assert_eq!(probe.count(Procedure::GetEquipment), n as usize + 1);
}

#[test]
fn test_cursor_error_is_not_exhaustion() {
    let (session, _) = sample();
    let mut cursor = session.next_equipment(EquipmentType(999));
    assert!(!cursor.advance());
    assert!(cursor.is_done());
    assert!(cursor.error().unwrap().is_native());
    assert!(session.next_equipment(EquipmentType(999)).collect_handles().is_err());
}

#[test]
fn test_cursors_compose_with_iterator_adapters() {
    let (session, _) = sample();
    let names: Vec<String> = session
        .next_equipment(EquipmentType::BUS)
        .map(|bus| session.full_bus_name(bus).unwrap())
        .collect();
    assert_eq!(names, ["NEVADA 132kV", "OHIO 132kV"]);
}

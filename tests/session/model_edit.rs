use oneliner_bridge::data::tokens::{BUS_D_KV_NOMINAL, BUS_N_NUMBER, BUS_S_NAME, LN_S_ID};
use oneliner_bridge::{BridgeError, EquipmentType, FieldValue};

use super::{nevada, sample};

#[test]
fn test_staged_edits_apply_on_post() {
    let (session, _) = sample();
    let bus = nevada(&session);
    session.set_data(bus, BUS_S_NAME, "RENO").unwrap();
    session.set_data(bus, BUS_N_NUMBER, 10).unwrap();
    assert!(session.find_bus_by_name("RENO", 132.0).is_err());

    session.post_data(bus).unwrap();
    assert_eq!(session.find_bus_by_name("RENO", 132.0).unwrap(), bus);
    assert_eq!(session.find_bus_no(10).unwrap(), bus);
    assert_eq!(session.full_bus_name(bus).unwrap(), "RENO 132kV");
}

#[test]
fn test_wrong_kind_is_rejected_locally() {
    let (session, probe) = sample();
    let bus = nevada(&session);
    let err = session.set_data(bus, BUS_D_KV_NOMINAL, "132").unwrap_err();
    assert!(matches!(err, BridgeError::InvalidArgument { .. }));
    let err = session
        .set_data(bus, BUS_N_NUMBER, FieldValue::IntegerArray(vec![1]))
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidArgument { .. }));
    assert_eq!(probe.count(oneliner_bridge::native::Procedure::SetDataEx), 0);
}

#[test]
fn test_branch_lookup_follows_circuit_id() {
    let (session, _) = sample();
    let branch = session.find_branch("NEVADA", 132.0, "OHIO", 132.0, "1").unwrap();
    assert_eq!(
        session.full_branch_name(branch).unwrap(),
        "NEVADA 132kV - OHIO 132kV 1 L"
    );

    // Renaming the circuit moves the match.
    let line = session.next_equipment(EquipmentType::LINE).next().unwrap();
    session.set_data(line, LN_S_ID, "2").unwrap();
    session.post_data(line).unwrap();
    assert!(matches!(
        session.find_branch("NEVADA", 132.0, "OHIO", 132.0, "1"),
        Err(BridgeError::NotFound { .. })
    ));
    assert_eq!(
        session.find_branch("NEVADA", 132.0, "OHIO", 132.0, "2").unwrap(),
        branch
    );

    // The reverse branch is a different object.
    let reverse = session.find_branch("OHIO", 132.0, "NEVADA", 132.0, "2").unwrap();
    assert_ne!(reverse, branch);
    assert!(session.find_branch("NEVADA", 132.0, "TEXAS", 132.0, "1").unwrap_err().is_native());
}

#[test]
fn test_annotations_round_trip_through_engine() {
    let (session, _) = sample();
    let bus = nevada(&session);
    session.set_tags(bus, ["substation", "hv"]).unwrap();
    session.append_memo(bus, "inspected").unwrap();

    let tagged = session
        .next_equipment_by_tag(EquipmentType::NOTHING, &["hv"])
        .collect_handles()
        .unwrap();
    assert_eq!(tagged, vec![bus]);
    assert!(session.memo_contains(bus, "inspected"));
    assert!(session.guid(bus).unwrap().starts_with('{'));
}

#[test]
fn test_model_file_round_trip() {
    let (session, _) = sample();
    session.load_data_file("SAMPLE.OLR").unwrap();
    session.save_data_file("EDITED.OLR").unwrap();
    session.close_data_file().unwrap();
    assert_eq!(session.olr_filename(), "");
    session.load_data_file_read_only("EDITED.OLR").unwrap();
    assert_eq!(session.olr_filename(), "EDITED.OLR");
    assert!(session.save_data_file("EDITED.OLR").is_err());
}

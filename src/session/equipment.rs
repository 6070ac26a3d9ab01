use itertools::Itertools;
use tracing::debug;

use super::Session;
use crate::codec;
use crate::cursor::{step_handle, HandleCursor};
use crate::data::tokens::*;
use crate::data::{EquipmentType, Handle};
use crate::error::{BridgeError, Result};
use crate::fault::{BoundaryConfig, OutageTypeMask};
use crate::native::{Arg, Procedure};

impl Session {
    pub fn equipment_type(&self, handle: Handle) -> Result<EquipmentType> {
        self.value(Procedure::EquipmentType, &mut [Arg::Int(handle.raw())])
            .map(EquipmentType)
    }

    /// Deletes the equipment. Other handles may be renumbered afterwards.
    pub fn delete_equipment(&self, handle: Handle) -> Result<()> {
        self.status(Procedure::DeleteEquipment, &mut [Arg::Int(handle.raw())])
    }

    pub fn find_bus_by_name(&self, name: &str, kv: f64) -> Result<Handle> {
        let name_buf = codec::encode_str(name)?;
        let mut hnd = [0u8; codec::INT_SIZE];
        let [kv_lo, kv_hi] = Arg::double(kv);
        self.status(
            Procedure::FindBusByName,
            &mut [Arg::In(&name_buf), kv_lo, kv_hi, Arg::Out(&mut hnd)],
        )?;
        Ok(Handle(codec::decode_i32(&hnd)))
    }

    pub fn find_bus_no(&self, number: i32) -> Result<Handle> {
        self.value(Procedure::FindBusNo, &mut [Arg::Int(number)])
            .map(Handle)
    }

    /// Every item of `kind` in the model.
    pub fn next_equipment(&self, kind: EquipmentType) -> HandleCursor {
        let session = self.clone();
        HandleCursor::new(move |prev| {
            step_handle(Procedure::GetEquipment.name(), prev, |hnd| {
                session
                    .gate
                    .invoke(Procedure::GetEquipment, &mut [Arg::Int(kind.0), Arg::Out(hnd)])
            })
        })
    }

    /// Every item of `kind` connected to `bus`.
    pub fn next_bus_equipment(&self, bus: Handle, kind: EquipmentType) -> HandleCursor {
        let session = self.clone();
        HandleCursor::new(move |prev| {
            step_handle(Procedure::GetBusEquipment.name(), prev, |hnd| {
                session.gate.invoke(
                    Procedure::GetBusEquipment,
                    &mut [Arg::Int(bus.raw()), Arg::Int(kind.0), Arg::Out(hnd)],
                )
            })
        })
    }

    /// Items of `kind` carrying every one of `tags`.
    pub fn next_equipment_by_tag<S: AsRef<str>>(&self, kind: EquipmentType, tags: &[S]) -> HandleCursor {
        let session = self.clone();
        let tags = codec::encode_str(&tags.iter().map(AsRef::as_ref).join(","));
        HandleCursor::new(move |prev| {
            let tags = tags.as_ref().map_err(Clone::clone)?;
            step_handle(Procedure::FindEquipmentByTag.name(), prev, |hnd| {
                session.gate.invoke(
                    Procedure::FindEquipmentByTag,
                    &mut [Arg::In(tags), Arg::Int(kind.0), Arg::Out(hnd)],
                )
            })
        })
    }

    /// Finds the branch from one named bus to another with circuit id `ckt`.
    ///
    /// The branch is looked up from the `from` side; the circuit id is
    /// compared with surrounding whitespace ignored.
    pub fn find_branch(
        &self,
        from_name: &str,
        from_kv: f64,
        to_name: &str,
        to_kv: f64,
        ckt: &str,
    ) -> Result<Handle> {
        const OP: &str = "FindBranch";
        let from = self.find_bus_by_name(from_name, from_kv)?;
        let to = self.find_bus_by_name(to_name, to_kv)?;

        let mut branches = self.next_bus_equipment(from, EquipmentType::BRANCH);
        while let Some(branch) = branches.next() {
            let (mut far_bus, mut equipment) = (0_i32, 0_i32);
            self.get_data(branch, &[BR_N_BUS2_HND, BR_N_HANDLE])
                .scan(&mut [&mut far_bus, &mut equipment])?;
            if Handle(far_bus) != to {
                continue;
            }

            let equipment = Handle(equipment);
            let id_token = match self.equipment_type(equipment)? {
                EquipmentType::LINE => LN_S_ID,
                EquipmentType::XFMR => XR_S_ID,
                EquipmentType::XFMR3 => X3_S_ID,
                EquipmentType::PHASE_SHIFTER => PS_S_ID,
                EquipmentType::SERIES_CAP => SC_S_ID,
                EquipmentType::SWITCH => SW_S_ID,
                other => {
                    return Err(BridgeError::invalid(
                        OP,
                        format!("branch {branch} leads to unsupported equipment type {other}"),
                    ))
                }
            };
            let mut id = String::new();
            self.get_data(equipment, &[id_token]).scan(&mut [&mut id])?;
            if id.trim() == ckt.trim() {
                debug!(%branch, %equipment, "branch found");
                return Ok(branch);
            }
        }
        if let Some(err) = branches.error() {
            return Err(err.clone());
        }
        Err(BridgeError::NotFound {
            operation: OP,
            what: format!("{from_name} {from_kv:.2}kV - {to_name} {to_kv:.2}kV ckt {ckt}"),
        })
    }

    /// Writes a boundary equivalent of the network around `buses` to `file`.
    pub fn boundary_equivalent(&self, file: &str, buses: &[Handle], config: BoundaryConfig) -> Result<()> {
        let file_buf = codec::encode_str(file)?;
        let words: Vec<i32> = buses.iter().map(|h| h.raw()).collect();
        let bus_buf = codec::encode_terminated_list(&words);
        let options = codec::encode_f64_array(&config.block());
        self.status(
            Procedure::BoundaryEquivalent,
            &mut [Arg::In(&file_buf), Arg::In(&bus_buf), Arg::In(&options)],
        )
    }

    /// Branches within `tiers` of `handle` whose type is in `mask`, ready to
    /// use as a fault outage list.
    ///
    /// The engine is asked for the length first and then for the list; both
    /// calls happen under one lock acquisition.
    pub fn make_outage_list(&self, handle: Handle, tiers: i32, mask: OutageTypeMask) -> Result<Vec<Handle>> {
        let op = Procedure::MakeOutageList.name();
        self.gate.exclusive(|inv| -> Result<Vec<Handle>> {
            let mut len_word = [0u8; codec::INT_SIZE];
            inv.invoke(
                Procedure::MakeOutageList,
                &mut [
                    Arg::Int(handle.raw()),
                    Arg::Int(tiers),
                    Arg::Int(mask.bits()),
                    Arg::Null,
                    Arg::Out(&mut len_word),
                ],
            )
            .require(op)?;
            let len = usize::try_from(codec::decode_i32(&len_word)).unwrap_or(0);

            let mut list = vec![0u8; (len + 1) * codec::INT_SIZE];
            inv.invoke(
                Procedure::MakeOutageList,
                &mut [
                    Arg::Int(handle.raw()),
                    Arg::Int(tiers),
                    Arg::Int(mask.bits()),
                    Arg::Out(&mut list),
                    Arg::Out(&mut len_word),
                ],
            )
            .require(op)?;
            Ok(codec::decode_i32_array(&list)
                .into_iter()
                .take(len)
                .map(Handle)
                .collect())
        })
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::data::ArrayLengths;
    use crate::fault::BoundaryOption;
    use crate::native::SimulatedEngine;

    fn session() -> Session {
        Session::with_engine(Box::new(SimulatedEngine::sample()), ArrayLengths::default())
    }

    #[test]
    fn test_bus_lookups_agree() {
        let s = session();
        let by_name = s.find_bus_by_name("OHIO", 132.0).unwrap();
        assert_eq!(s.find_bus_no(2).unwrap(), by_name);
        assert_eq!(s.equipment_type(by_name).unwrap(), EquipmentType::BUS);
        assert!(s.find_bus_by_name("OHIO", 66.0).unwrap_err().is_native());
    }

    #[test]
    fn test_enumerate_buses_and_bus_equipment() {
        let s = session();
        let buses = s.next_equipment(EquipmentType::BUS).collect_handles().unwrap();
        assert_eq!(buses.len(), 2);

        let nevada = s.find_bus_no(1).unwrap();
        let lines = s
            .next_bus_equipment(nevada, EquipmentType::LINE)
            .collect_handles()
            .unwrap();
        assert_eq!(lines.len(), 1);

        let switches = s.next_equipment(EquipmentType::SWITCH).collect_handles().unwrap();
        assert!(switches.is_empty());
    }

    #[test]
    fn test_bus_equipment_on_non_bus_records_error() {
        let s = session();
        let mut cursor = s.next_bus_equipment(Handle::SYSTEM, EquipmentType::LINE);
        assert!(!cursor.advance());
        assert!(cursor.error().unwrap().is_native());
    }

    #[test]
    fn test_find_by_tag() {
        let s = session();
        let ohio = s.find_bus_no(2).unwrap();
        s.set_tags(ohio, ["east", "hv"]).unwrap();
        let found = s
            .next_equipment_by_tag(EquipmentType::BUS, &["hv"])
            .collect_handles()
            .unwrap();
        assert_eq!(found, vec![ohio]);
        let none = s
            .next_equipment_by_tag(EquipmentType::BUS, &["hv", "west"])
            .collect_handles()
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_find_branch() {
        let s = session();
        let branch = s.find_branch("NEVADA", 132.0, "OHIO", 132.0, " 1 ").unwrap();
        assert_eq!(s.equipment_type(branch).unwrap(), EquipmentType::BRANCH);

        let err = s.find_branch("NEVADA", 132.0, "OHIO", 132.0, "2").unwrap_err();
        assert!(matches!(err, BridgeError::NotFound { .. }));
    }

    #[test]
    fn test_delete_equipment() {
        let s = session();
        let ohio = s.find_bus_no(2).unwrap();
        s.delete_equipment(ohio).unwrap();
        assert!(s.find_bus_no(2).is_err());
        assert!(s.delete_equipment(ohio).is_err());
    }

    #[test]
    fn test_make_outage_list_single_lock() {
        let sim = SimulatedEngine::sample();
        let probe = sim.probe();
        let s = Session::with_engine(Box::new(sim), ArrayLengths::default());
        let nevada = s.find_bus_no(1).unwrap();
        let outages = s.make_outage_list(nevada, 1, OutageTypeMask::LINE).unwrap();
        assert_eq!(outages.len(), 1);
        assert_eq!(s.equipment_type(outages[0]).unwrap(), EquipmentType::LINE);
        assert_eq!(probe.count(Procedure::MakeOutageList), 2);

        let none = s.make_outage_list(nevada, 1, OutageTypeMask::SWITCH).unwrap();
        assert!(none.is_empty());
        assert!(s.make_outage_list(nevada, 0, OutageTypeMask::ALL).is_err());
    }

    #[test]
    fn test_boundary_equivalent() {
        let s = session();
        let nevada = s.find_bus_no(1).unwrap();
        let cfg = BoundaryConfig::new([BoundaryOption::EliminationThreshold(0.1)]);
        // Needs an open model.
        assert!(s.boundary_equivalent("EQ.OLR", &[nevada], cfg).is_err());
        s.load_data_file("SAMPLE.OLR").unwrap();
        s.boundary_equivalent("EQ.OLR", &[nevada], cfg).unwrap();
        assert!(s.boundary_equivalent("EQ.OLR", &[], cfg).is_err());
        s.load_data_file("EQ.OLR").unwrap();
    }
}

//! In-memory stand-in for the engine library.
//!
//! `SimulatedEngine` speaks the same word-level contract as
//! [`super::LibraryEngine`]: the same argument layouts, return codes and
//! error side-channel. It keeps a small network model (buses, lines with
//! their branches, relay groups, relays) and produces fault results from
//! textbook sequence-network formulas, which is enough to drive every
//! operation of a [`crate::Session`] in tests and demos without the vendor
//! runtime.
//!
//! A [`SimProbe`] shares call counts and the number of in-flight calls with
//! the test that created it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use num_complex::Complex64;
use parking_lot::Mutex;
use tracing::debug;

use super::{Arg, NativeEngine, Procedure, FAILURE, OK, SENTINEL};
use crate::codec;
use crate::data::tokens::*;
use crate::data::{EquipmentType, FieldKind, FieldValue, Handle, Token};
use crate::phasor::{seq_to_phase, Phasor};

const FIRST_HANDLE: i32 = 101;
const DEFAULT_VERSION: &str = "ASPEN OlxAPI 15.4 Build 17500 (simulated)";
const DEFAULT_Z1: Complex64 = Complex64::new(0.5, 5.0);
const DEFAULT_Z0: Complex64 = Complex64::new(1.5, 15.0);

/// Call statistics shared between a [`SimulatedEngine`] and its observers.
#[derive(Debug, Clone, Default)]
pub struct SimProbe {
    calls: Arc<Mutex<HashMap<Procedure, usize>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl SimProbe {
    /// Number of times `procedure` reached the engine.
    pub fn count(&self, procedure: Procedure) -> usize {
        self.calls.lock().get(&procedure).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Highest number of calls observed inside the engine at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Number of times the engine was released.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn enter(&self, procedure: Procedure) {
        *self.calls.lock().entry(procedure).or_default() += 1;
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fault connection as carried in the `fltConn` block and the stepped event
/// connection code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connection {
    ThreePhase,
    TwoPhaseGround,
    SinglePhaseGround,
    PhasePhase,
}

impl Connection {
    fn from_block_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(Connection::ThreePhase),
            1 => Some(Connection::TwoPhaseGround),
            2 => Some(Connection::SinglePhaseGround),
            3 => Some(Connection::PhasePhase),
            _ => None,
        }
    }

    fn from_event_code(code: f64) -> Option<Self> {
        match code as i32 {
            1 => Some(Connection::ThreePhase),
            4 => Some(Connection::TwoPhaseGround),
            5 => Some(Connection::SinglePhaseGround),
            8 => Some(Connection::PhasePhase),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Connection::ThreePhase => "3LG",
            Connection::TwoPhaseGround => "2LG",
            Connection::SinglePhaseGround => "1LG",
            Connection::PhasePhase => "LL",
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Equipment {
    kind: EquipmentType,
    fields: HashMap<Token, FieldValue>,
    staged: HashMap<Token, FieldValue>,
    /// Equipment at a bus, or relays in a relay group.
    members: Vec<Handle>,
    schemes: Vec<Handle>,
    tags: Vec<String>,
    memo: String,
    udfs: Vec<(String, String)>,
    journal: [String; 4],
}

impl Equipment {
    fn new(kind: EquipmentType, fields: Vec<(Token, FieldValue)>) -> Self {
        Self {
            kind,
            fields: fields.into_iter().collect(),
            journal: [
                "2021-01-01 00:00".to_string(),
                "sim".to_string(),
                "2021-01-01 00:00".to_string(),
                "sim".to_string(),
            ],
            ..Default::default()
        }
    }

    fn text(&self, token: Token) -> String {
        match self.fields.get(&token) {
            Some(FieldValue::Text(s)) => s.clone(),
            _ => String::new(),
        }
    }

    fn double(&self, token: Token) -> f64 {
        match self.fields.get(&token) {
            Some(FieldValue::Double(d)) => *d,
            _ => 0.0,
        }
    }

    fn integer(&self, token: Token) -> i32 {
        match self.fields.get(&token) {
            Some(FieldValue::Integer(i)) => *i,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
struct FaultResult {
    bus: Handle,
    /// Sequence currents into the fault (A).
    current: [Complex64; 3],
    /// Sequence voltages at the faulted bus (kV).
    voltage: [Complex64; 3],
    description: String,
}

#[derive(Debug, Clone)]
struct SteppedEvent {
    time: f64,
    current: f64,
    user_event: bool,
    description: String,
    fault_description: String,
}

/// See the module documentation.
pub struct SimulatedEngine {
    version: String,
    equipment: BTreeMap<Handle, Equipment>,
    next_handle: i32,
    sources: HashMap<Handle, (Complex64, Complex64)>,
    relay_times: HashMap<Handle, f64>,
    areas: HashMap<i32, String>,
    zones: HashMap<i32, String>,
    files: HashSet<String>,
    open_file: Option<String>,
    read_only: bool,
    faults: Vec<FaultResult>,
    picked: Option<usize>,
    events: Vec<SteppedEvent>,
    last_error: String,
    probe: SimProbe,
    call_delay: Option<Duration>,
    released: bool,
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            equipment: BTreeMap::new(),
            next_handle: FIRST_HANDLE,
            sources: HashMap::new(),
            relay_times: HashMap::new(),
            areas: HashMap::new(),
            zones: HashMap::new(),
            files: HashSet::new(),
            open_file: None,
            read_only: false,
            faults: Vec::new(),
            picked: None,
            events: Vec::new(),
            last_error: String::new(),
            probe: SimProbe::default(),
            call_delay: None,
            released: false,
        }
    }

    /// Small two-bus case: buses `NEVADA` (1) and `OHIO` (2) at 132 kV joined
    /// by line `1`, with a relay group on the `NEVADA` end holding one phase
    /// and one ground overcurrent relay.
    pub fn sample() -> Self {
        let mut sim = Self::new().with_data_file("SAMPLE.OLR");
        let nevada = sim.add_bus("NEVADA", 132.0, 1);
        let ohio = sim.add_bus("OHIO", 132.0, 2);
        let line = sim.add_line(nevada, ohio, "1");
        let group = sim.add_relay_group(line);
        sim.add_relay(group, EquipmentType::RELAY_OC_PHASE, "NV-P", 0.35);
        sim.add_relay(group, EquipmentType::RELAY_OC_GROUND, "NV-G", 0.55);
        sim.add_area(1, "WEST");
        sim.add_zone(1, "NORTH");
        sim
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Registers a file name `LoadDataFile` will accept.
    pub fn with_data_file(mut self, name: impl Into<String>) -> Self {
        self.files.insert(name.into());
        self
    }

    /// Sleeps inside every call, widening the window in which overlapping
    /// calls would be observed.
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    pub fn probe(&self) -> SimProbe {
        self.probe.clone()
    }

    pub fn add_equipment(&mut self, kind: EquipmentType, fields: Vec<(Token, FieldValue)>) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        self.equipment.insert(handle, Equipment::new(kind, fields));
        handle
    }

    /// Lists `member` under `owner` (equipment at a bus, relay in a group).
    pub fn attach(&mut self, owner: Handle, member: Handle) {
        if let Some(e) = self.equipment.get_mut(&owner) {
            e.members.push(member);
        }
    }

    pub fn add_bus(&mut self, name: &str, kv: f64, number: i32) -> Handle {
        self.add_equipment(
            EquipmentType::BUS,
            vec![
                (BUS_S_NAME, name.into()),
                (BUS_S_LOCATION, "".into()),
                (BUS_D_KV_NOMINAL, kv.into()),
                (BUS_N_NUMBER, number.into()),
                (BUS_N_AREA, 1.into()),
                (BUS_N_ZONE, 1.into()),
            ],
        )
    }

    /// Adds a line and the branch object seen from each of its ends.
    pub fn add_line(&mut self, bus1: Handle, bus2: Handle, id: &str) -> Handle {
        let line = self.add_equipment(
            EquipmentType::LINE,
            vec![
                (LN_S_ID, id.into()),
                (LN_S_NAME, "".into()),
                (LN_D_R, 0.01.into()),
                (LN_D_X, 0.1.into()),
                (LN_D_R0, 0.03.into()),
                (LN_D_X0, 0.3.into()),
                (LN_D_LENGTH, 10.0.into()),
                (LN_N_BUS1_HND, bus1.0.into()),
                (LN_N_BUS2_HND, bus2.0.into()),
                (LN_N_IN_SERVICE, 1.into()),
                (LN_V_D_RATING, FieldValue::DoubleArray(vec![600.0, 800.0, 1000.0, 1200.0])),
            ],
        );
        for (from, to) in [(bus1, bus2), (bus2, bus1)] {
            let branch = self.add_equipment(
                EquipmentType::BRANCH,
                vec![
                    (BR_N_BUS1_HND, from.0.into()),
                    (BR_N_BUS2_HND, to.0.into()),
                    (BR_N_HANDLE, line.0.into()),
                    (BR_N_TYPE, EquipmentType::LINE.0.into()),
                ],
            );
            self.attach(from, branch);
        }
        self.attach(bus1, line);
        self.attach(bus2, line);
        line
    }

    pub fn add_relay_group(&mut self, line: Handle) -> Handle {
        let group = self.add_equipment(
            EquipmentType::RELAY_GROUP,
            vec![
                (RG_S_NOTE, "".into()),
                (RG_V_N_PRIMARY, FieldValue::IntegerArray(vec![0; MAX_ZONES])),
            ],
        );
        if let Some(e) = self.equipment.get_mut(&line) {
            e.fields.insert(LN_N_RLY_GR1_HND, group.0.into());
        }
        group
    }

    /// Adds a relay that operates in `op_time` seconds at unit multiplier.
    pub fn add_relay(&mut self, group: Handle, kind: EquipmentType, id: &str, op_time: f64) -> Handle {
        let id_token = match kind {
            EquipmentType::RELAY_DS_GROUND => DG_S_ID,
            EquipmentType::RELAY_DS_PHASE => DP_S_ID,
            _ => OG_S_ID,
        };
        let mut fields = vec![(id_token, FieldValue::from(id))];
        if kind == EquipmentType::RELAY_DS_GROUND {
            fields.push((DG_V_D_PARAMS, FieldValue::DoubleArray(vec![0.0; MAX_DS_PARAMS])));
        }
        let relay = self.add_equipment(kind, fields);
        self.relay_times.insert(relay, op_time);
        self.attach(group, relay);
        relay
    }

    pub fn add_logic_scheme(&mut self, group: Handle) -> Handle {
        let scheme = self.add_equipment(EquipmentType::SCHEME, Vec::new());
        if let Some(e) = self.equipment.get_mut(&group) {
            e.schemes.push(scheme);
        }
        scheme
    }

    pub fn add_area(&mut self, number: i32, name: &str) {
        self.areas.insert(number, name.to_string());
    }

    pub fn add_zone(&mut self, number: i32, name: &str) {
        self.zones.insert(number, name.to_string());
    }

    pub fn add_udf(&mut self, handle: Handle, field: &str, value: &str) {
        if let Some(e) = self.equipment.get_mut(&handle) {
            e.udfs.push((field.to_string(), value.to_string()));
        }
    }

    pub fn set_journal(&mut self, handle: Handle, record: [&str; 4]) {
        if let Some(e) = self.equipment.get_mut(&handle) {
            e.journal = record.map(str::to_string);
        }
    }

    /// Positive and zero sequence source impedance (ohms) seen at `bus`.
    pub fn set_source_impedance(&mut self, bus: Handle, z1: Complex64, z0: Complex64) {
        self.sources.insert(bus, (z1, z0));
    }

    fn fail(&mut self, message: impl Into<String>) -> i32 {
        self.last_error = message.into();
        FAILURE
    }

    fn kind_of(&self, handle: Handle) -> Option<EquipmentType> {
        match handle {
            Handle::SYSTEM => Some(EquipmentType::SYSTEM),
            Handle::POWER_FLOW => Some(EquipmentType::POWER_FLOW),
            Handle::SHORT_CIRCUIT => Some(EquipmentType::SHORT_CIRCUIT),
            h => self.equipment.get(&h).map(|e| e.kind),
        }
    }

    fn bus_kv(&self, bus: Handle) -> f64 {
        self.equipment.get(&bus).map_or(0.0, |e| e.double(BUS_D_KV_NOMINAL))
    }

    fn bus_label(&self, bus: Handle) -> String {
        self.equipment.get(&bus).map_or_else(String::new, |e| {
            format!("{} {}kV", e.text(BUS_S_NAME), e.double(BUS_D_KV_NOMINAL))
        })
    }

    /// The bus a fault on `handle` is applied at.
    fn fault_bus(&self, handle: Handle) -> Option<Handle> {
        let e = self.equipment.get(&handle)?;
        match e.kind {
            EquipmentType::BUS => Some(handle),
            EquipmentType::LINE => Some(Handle(e.integer(LN_N_BUS1_HND))),
            EquipmentType::BRANCH => Some(Handle(e.integer(BR_N_BUS1_HND))),
            _ => None,
        }
    }

    /// Sequence currents and post-fault sequence voltages for a bolted or
    /// impedance fault at `bus`.
    fn solve(&self, bus: Handle, connection: Connection, zf: Complex64) -> ([Complex64; 3], [Complex64; 3]) {
        let (z1, z0) = self.sources.get(&bus).copied().unwrap_or((DEFAULT_Z1, DEFAULT_Z0));
        let z2 = z1;
        let vf = Complex64::new(self.bus_kv(bus) * 1000.0 / 3f64.sqrt(), 0.0);
        let zero = Complex64::new(0.0, 0.0);

        let (i0, i1, i2) = match connection {
            Connection::ThreePhase => (zero, vf / (z1 + zf), zero),
            Connection::SinglePhaseGround => {
                let i = vf / (z0 + z1 + z2 + zf * 3.0);
                (i, i, i)
            }
            Connection::PhasePhase => {
                let i = vf / (z1 + z2 + zf);
                (zero, i, -i)
            }
            Connection::TwoPhaseGround => {
                let zg = z0 + zf * 3.0;
                let i1 = vf / (z1 + z2 * zg / (z2 + zg));
                (-i1 * z2 / (z2 + zg), i1, -i1 * zg / (z2 + zg))
            }
        };

        let kv = |v: Complex64| v / 1000.0;
        let voltage = [kv(-z0 * i0), kv(vf - z1 * i1), kv(-z2 * i2)];
        ([i0, i1, i2], voltage)
    }

    fn picked_fault(&self) -> Option<&FaultResult> {
        self.picked.and_then(|i| self.faults.get(i))
    }

    // Procedure bodies.

    fn version_info(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let version = self.version.clone();
        write_text(args, 0, &version);
        OK
    }

    fn load_data_file(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let name = text_at(args, 0);
        if !self.files.contains(&name) {
            return self.fail(format!("Failed to open file {name}"));
        }
        self.open_file = Some(name);
        self.read_only = int_at(args, 1) != 0;
        self.faults.clear();
        self.picked = None;
        self.events.clear();
        OK
    }

    fn save_data_file(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let name = text_at(args, 0);
        if self.open_file.is_none() {
            return self.fail("No network data file is open");
        }
        if self.read_only && self.open_file.as_deref() == Some(name.as_str()) {
            return self.fail(format!("{name} was opened read-only"));
        }
        if name.is_empty() {
            return self.fail("Invalid file name");
        }
        self.files.insert(name);
        OK
    }

    fn close_data_file(&mut self) -> i32 {
        if self.open_file.take().is_none() {
            return self.fail("No network data file is open");
        }
        OK
    }

    fn read_change_file(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let name = text_at(args, 0);
        if self.open_file.is_none() {
            return self.fail("No network data file is open");
        }
        if !name.to_ascii_lowercase().ends_with(".chf") {
            return self.fail(format!("{name} is not a change file"));
        }
        OK
    }

    /// Shared walk for the "get next" procedures. The out word holds the
    /// previous handle (0 to start) and receives the next one.
    fn next_in(&mut self, candidates: Vec<Handle>, args: &mut [Arg<'_>], slot: usize) -> i32 {
        let current = Handle(int_at(args, slot));
        let next = if current.0 == 0 {
            candidates.first().copied()
        } else {
            match candidates.iter().position(|&h| h == current) {
                Some(i) => candidates.get(i + 1).copied(),
                None => return self.fail(format!("Invalid handle {current}")),
            }
        };
        match next {
            Some(h) => {
                write_bytes(args, slot, &codec::encode_i32(h.0));
                OK
            }
            None => SENTINEL,
        }
    }

    fn of_kind(&self, handles: impl Iterator<Item = Handle>, kind: EquipmentType) -> Vec<Handle> {
        handles.filter(|h| self.kind_of(*h) == Some(kind)).collect()
    }

    fn get_equipment(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let kind = EquipmentType(int_at(args, 0));
        if !(1..=EquipmentType::SETTINGS.0).contains(&kind.0) {
            return self.fail(format!("Invalid equipment type {kind}"));
        }
        let candidates = self.of_kind(self.equipment.keys().copied(), kind);
        self.next_in(candidates, args, 1)
    }

    fn get_bus_equipment(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let bus = Handle(int_at(args, 0));
        let kind = EquipmentType(int_at(args, 1));
        let Some(e) = self.equipment.get(&bus).filter(|e| e.kind == EquipmentType::BUS) else {
            return self.fail(format!("Invalid bus handle {bus}"));
        };
        let members = e.members.clone();
        let candidates = self.of_kind(members.into_iter(), kind);
        self.next_in(candidates, args, 2)
    }

    fn find_equipment_by_tag(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let wanted: Vec<String> = text_at(args, 0)
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let kind = EquipmentType(int_at(args, 1));
        let candidates = self
            .equipment
            .iter()
            .filter(|(_, e)| kind == EquipmentType::NOTHING || e.kind == kind)
            .filter(|(_, e)| wanted.iter().all(|t| e.tags.contains(t)))
            .map(|(h, _)| *h)
            .collect();
        self.next_in(candidates, args, 2)
    }

    fn get_relay(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let group = Handle(int_at(args, 0));
        let Some(e) = self.equipment.get(&group).filter(|e| e.kind == EquipmentType::RELAY_GROUP) else {
            return self.fail(format!("Invalid relay group handle {group}"));
        };
        let members = e.members.clone();
        self.next_in(members, args, 1)
    }

    fn get_logic_scheme(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let group = Handle(int_at(args, 0));
        let Some(e) = self.equipment.get(&group).filter(|e| e.kind == EquipmentType::RELAY_GROUP) else {
            return self.fail(format!("Invalid relay group handle {group}"));
        };
        let schemes = e.schemes.clone();
        self.next_in(schemes, args, 1)
    }

    fn delete_equipment(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        if self.equipment.remove(&handle).is_none() {
            return self.fail(format!("Invalid handle {handle}"));
        }
        for e in self.equipment.values_mut() {
            e.members.retain(|&h| h != handle);
            e.schemes.retain(|&h| h != handle);
        }
        OK
    }

    fn equipment_type(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        match self.kind_of(handle) {
            Some(kind) => kind.0,
            None => self.fail(format!("Invalid handle {handle}")),
        }
    }

    fn get_data(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        let token = Token(int_at(args, 1));
        let Some(e) = self.equipment.get(&handle) else {
            return self.fail(format!("GetData failure: invalid handle {handle}"));
        };
        let Some(value) = e.fields.get(&token) else {
            return self.fail(format!("GetData failure: invalid token {token}"));
        };
        let bytes = match value {
            FieldValue::Text(s) => codec::encode_str(s).unwrap_or_else(|_| vec![0]),
            FieldValue::Double(d) => codec::encode_f64(*d).to_vec(),
            FieldValue::Integer(i) => codec::encode_i32(*i).to_vec(),
            FieldValue::TextArray(v) => codec::encode_str(&v.join("\t")).unwrap_or_else(|_| vec![0]),
            FieldValue::DoubleArray(v) => codec::encode_f64_array(v),
            FieldValue::IntegerArray(v) => codec::encode_i32_array(v),
        };
        write_bytes(args, 2, &bytes);
        OK
    }

    fn set_data(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        let token = Token(int_at(args, 1));
        let input = bytes_at(args, 2);
        let value = match token.kind() {
            Some(FieldKind::Text) => FieldValue::Text(codec::decode_str(input)),
            Some(FieldKind::Double) if input.len() >= codec::DOUBLE_SIZE => {
                FieldValue::Double(codec::decode_f64(input))
            }
            Some(FieldKind::Integer) if input.len() >= codec::INT_SIZE => {
                FieldValue::Integer(codec::decode_i32(input))
            }
            _ => return self.fail(format!("SetData failure: token {token} cannot be set")),
        };
        let Some(e) = self.equipment.get_mut(&handle) else {
            return self.fail(format!("SetData failure: invalid handle {handle}"));
        };
        if !e.fields.contains_key(&token) {
            return self.fail(format!("SetData failure: invalid token {token}"));
        }
        e.staged.insert(token, value);
        OK
    }

    fn post_data(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        let Some(e) = self.equipment.get_mut(&handle) else {
            return self.fail(format!("PostData failure: invalid handle {handle}"));
        };
        if let Some(FieldValue::Double(kv)) = e.staged.get(&BUS_D_KV_NOMINAL) {
            if *kv <= 0.0 {
                let kv = *kv;
                e.staged.clear();
                return self.fail(format!("PostData failure: invalid nominal kV {kv}"));
            }
        }
        let staged = std::mem::take(&mut e.staged);
        e.fields.extend(staged);
        OK
    }

    fn find_bus_by_name(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let name = text_at(args, 0);
        let kv = double_at(args, 1);
        let found = self.equipment.iter().find(|(_, e)| {
            e.kind == EquipmentType::BUS
                && e.text(BUS_S_NAME) == name
                && (e.double(BUS_D_KV_NOMINAL) - kv).abs() < 1e-3
        });
        match found {
            Some((h, _)) => {
                let bytes = codec::encode_i32(h.0);
                write_bytes(args, 3, &bytes);
                OK
            }
            None => self.fail(format!("Bus {name} {kv}kV not found")),
        }
    }

    fn find_bus_no(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let number = int_at(args, 0);
        let found = self
            .equipment
            .iter()
            .find(|(_, e)| e.kind == EquipmentType::BUS && e.integer(BUS_N_NUMBER) == number);
        match found {
            Some((h, _)) => h.0,
            None => self.fail(format!("Bus number {number} not found")),
        }
    }

    fn boundary_equivalent(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let file = text_at(args, 0);
        let buses = codec::decode_terminated_list(bytes_at(args, 1));
        let options = codec::decode_f64_array(bytes_at(args, 2));
        if self.open_file.is_none() {
            return self.fail("No network data file is open");
        }
        if buses.is_empty() {
            return self.fail("Empty bus list");
        }
        if let Some(b) = buses.iter().find(|&&b| self.kind_of(Handle(b)) != Some(EquipmentType::BUS)) {
            return self.fail(format!("Invalid bus handle {b}"));
        }
        if options.first().is_some_and(|t| *t < 0.0) {
            return self.fail("Invalid elimination threshold");
        }
        self.files.insert(file);
        OK
    }

    fn make_outage_list(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        let tiers = int_at(args, 1);
        let mask = int_at(args, 2);
        if tiers < 1 {
            return self.fail("Number of tiers must be at least 1");
        }
        let Some(bus) = self.fault_bus(handle) else {
            return self.fail(format!("Invalid handle {handle}"));
        };
        let kinds: Vec<EquipmentType> = [
            (1, EquipmentType::LINE),
            (2, EquipmentType::XFMR),
            (4, EquipmentType::PHASE_SHIFTER),
            (8, EquipmentType::XFMR3),
            (16, EquipmentType::SWITCH),
        ]
        .into_iter()
        .filter(|(bit, _)| mask & bit != 0)
        .map(|(_, k)| k)
        .collect();
        let members = self.equipment.get(&bus).map(|e| e.members.clone()).unwrap_or_default();
        let list: Vec<i32> = members
            .into_iter()
            .filter(|h| self.kind_of(*h).is_some_and(|k| kinds.contains(&k)))
            .map(|h| h.0)
            .collect();

        let len = i32::try_from(list.len()).unwrap_or(i32::MAX);
        if matches!(args.get(3), Some(Arg::Out(_))) {
            write_bytes(args, 3, &codec::encode_terminated_list(&list));
        }
        write_bytes(args, 4, &codec::encode_i32(len));
        OK
    }

    fn do_fault(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        let connections = codec::decode_i32_array(bytes_at(args, 1));
        let options = codec::decode_f64_array(bytes_at(args, 2));
        let r = double_at(args, 5);
        let x = double_at(args, 7);
        let clear = int_at(args, 9) != 0;

        self.picked = None;
        let Some(bus) = self.fault_bus(handle) else {
            return self.fail(format!("DoFault: invalid equipment handle {handle}"));
        };
        let connections: Vec<Connection> = connections
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != 0)
            .filter_map(|(i, _)| Connection::from_block_index(i))
            .collect();
        if connections.is_empty() {
            return self.fail("DoFault: no fault connection specified");
        }
        let cases = options.iter().take(12).filter(|&&o| o != 0.0).count().max(1);

        if clear {
            self.faults.clear();
        }
        let zf = Complex64::new(r, x);
        let label = self.bus_label(bus);
        for _ in 0..cases {
            for &connection in &connections {
                let (current, voltage) = self.solve(bus, connection, zf);
                let n = self.faults.len() + 1;
                self.faults.push(FaultResult {
                    bus,
                    current,
                    voltage,
                    description: format!("{n}. Bus Fault on: {label} {}", connection.label()),
                });
            }
        }
        debug!(faults = self.faults.len(), "simulated fault run");
        OK
    }

    fn fault_description(&mut self, args: &mut [Arg<'_>]) -> String {
        let index = int_at(args, 0);
        usize::try_from(index - 1)
            .ok()
            .and_then(|i| self.faults.get(i))
            .map(|f| format!("{}\n", f.description))
            .unwrap_or_default()
    }

    fn pick_fault(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let code = int_at(args, 0);
        let count = self.faults.len();
        if count == 0 {
            return self.fail("No fault simulation result available");
        }
        let target = match code {
            -1 => Some(count - 1),
            -2 => Some(self.picked.map_or(0, |i| i + 1)),
            -4 => self.picked.and_then(|i| i.checked_sub(1)),
            n if n > 0 => usize::try_from(n - 1).ok(),
            _ => None,
        };
        match target.filter(|&i| i < count) {
            Some(i) => {
                self.picked = Some(i);
                OK
            }
            None => self.fail(format!("Fault index {code} is out of range")),
        }
    }

    fn psc_voltage(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        let style = int_at(args, 3);
        if self.kind_of(handle) != Some(EquipmentType::BUS) {
            return self.fail(format!("Invalid bus handle {handle}"));
        }
        let mag = match style {
            1 => self.bus_kv(handle) / 3f64.sqrt(),
            2 => 1.0,
            _ => return self.fail(format!("Invalid style code {style}")),
        };
        write_bytes(args, 1, &codec::encode_f64_array(&[mag, 0.0, 0.0]));
        write_bytes(args, 2, &codec::encode_f64_array(&[0.0; 3]));
        OK
    }

    fn sc_values(&mut self, args: &mut [Arg<'_>], current: bool) -> i32 {
        let handle = Handle(int_at(args, 0));
        let style = int_at(args, 3);
        if !(1..=4).contains(&style) {
            return self.fail(format!("Invalid style code {style}"));
        }
        let Some(fault) = self.picked_fault().cloned() else {
            return self.fail("No fault picked");
        };
        let zero = Complex64::new(0.0, 0.0);

        let seq = if current {
            match self.kind_of(handle) {
                Some(EquipmentType::SHORT_CIRCUIT) => fault.current,
                Some(EquipmentType::BUS) | None => {
                    return self.fail(format!("Invalid handle {handle} for current output"))
                }
                Some(_) => {
                    let members = self.equipment.get(&fault.bus).map(|e| e.members.clone()).unwrap_or_default();
                    if members.contains(&handle) {
                        let share = members.len() as f64;
                        fault.current.map(|i| i / share)
                    } else {
                        [zero; 3]
                    }
                }
            }
        } else {
            match self.kind_of(handle) {
                Some(EquipmentType::BUS) if handle == fault.bus => fault.voltage,
                Some(EquipmentType::BUS) => {
                    [zero, Complex64::new(self.bus_kv(handle) / 3f64.sqrt(), 0.0), zero]
                }
                Some(_) => [zero; 3],
                None => return self.fail(format!("Invalid handle {handle}")),
            }
        };

        let values = if style >= 3 {
            let (a, b, c) = seq_to_phase(seq[0].into(), seq[1].into(), seq[2].into());
            [a, b, c]
        } else {
            seq.map(Phasor::from)
        };
        let width = if current { 12 } else { 9 };
        let mut out1 = vec![0.0; width];
        let mut out2 = vec![0.0; width];
        for (i, p) in values.iter().enumerate() {
            let (x, y) = if style % 2 == 0 { (p.mag(), p.ang()) } else { (p.re(), p.im()) };
            out1[i] = x;
            out2[i] = y;
        }
        write_bytes(args, 1, &codec::encode_f64_array(&out1));
        write_bytes(args, 2, &codec::encode_f64_array(&out2));
        OK
    }

    fn do_stepped_event(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        let options = codec::decode_f64_array(bytes_at(args, 1));
        let relays = codec::decode_i32_array(bytes_at(args, 2));
        let tiers = int_at(args, 3);

        self.picked = None;
        self.events.clear();
        let Some(bus) = self.fault_bus(handle) else {
            return self.fail(format!("DoSteppedEvent: invalid equipment handle {handle}"));
        };
        let Some(connection) = options.first().and_then(|c| Connection::from_event_code(*c)) else {
            return self.fail("DoSteppedEvent: invalid fault connection code");
        };
        if tiers < 1 {
            return self.fail("DoSteppedEvent: number of tiers must be at least 1");
        }
        let zf = Complex64::new(
            options.get(2).copied().unwrap_or(0.0),
            options.get(3).copied().unwrap_or(0.0),
        );
        let (current, voltage) = self.solve(bus, connection, zf);
        let description = format!("1. Bus Fault on: {} {}", self.bus_label(bus), connection.label());
        let magnitude = current.iter().sum::<Complex64>().norm();

        self.events.push(SteppedEvent {
            time: 0.0,
            current: magnitude,
            user_event: true,
            description: "Fault initiated".to_string(),
            fault_description: description.clone(),
        });
        let families = relays.iter().filter(|&&r| r != 0).count();
        for step in 1..=families {
            self.events.push(SteppedEvent {
                time: 0.1 * step as f64,
                current: magnitude,
                user_event: false,
                description: format!("Relay operation {step}"),
                fault_description: description.clone(),
            });
        }
        self.faults = vec![FaultResult {
            bus,
            current,
            voltage,
            description,
        }];
        OK
    }

    fn get_stepped_event(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let step = int_at(args, 0);
        let Some(event) = usize::try_from(step - 1).ok().and_then(|i| self.events.get(i)).cloned() else {
            return self.fail(format!("Stepped event step {step} is out of range"));
        };
        write_bytes(args, 1, &codec::encode_f64(event.time));
        write_bytes(args, 2, &codec::encode_f64(event.current));
        write_bytes(args, 3, &codec::encode_i32(i32::from(event.user_event)));
        write_text(args, 4, &event.description);
        write_text(args, 5, &event.fault_description);
        OK
    }

    fn relay_time(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let relay = Handle(int_at(args, 0));
        let mult = double_at(args, 1);
        let Some(&op_time) = self.relay_times.get(&relay) else {
            return self.fail(format!("Invalid relay handle {relay}"));
        };
        if self.picked_fault().is_none() {
            return self.fail("No fault picked");
        }
        let id = self.relay_id(relay);
        write_bytes(args, 3, &codec::encode_f64(op_time / mult));
        write_text(args, 4, &format!("{id} operated"));
        OK
    }

    fn compute_relay_time(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let relay = Handle(int_at(args, 0));
        let magnitudes = codec::decode_f64_array(bytes_at(args, 1));
        let Some(&op_time) = self.relay_times.get(&relay) else {
            return self.fail(format!("Invalid relay handle {relay}"));
        };
        let peak = magnitudes.iter().take(3).fold(0.0_f64, |m, v| m.max(*v));
        let id = self.relay_id(relay);
        let (time, text) = if peak > 0.0 {
            (op_time, format!("{id} operated"))
        } else {
            (9999.0, format!("{id} no operation"))
        };
        write_bytes(args, 9, &codec::encode_f64(time));
        write_text(args, 10, &text);
        OK
    }

    fn relay_id(&self, relay: Handle) -> String {
        self.equipment.get(&relay).map_or_else(String::new, |e| {
            [OG_S_ID, DG_S_ID, DP_S_ID]
                .into_iter()
                .map(|t| e.text(t))
                .find(|s| !s.is_empty())
                .unwrap_or_default()
        })
    }

    fn object_text(&mut self, procedure: Procedure, args: &mut [Arg<'_>]) -> String {
        let handle = Handle(int_at(args, 0));
        let name = procedure.name();
        let Some(e) = self.equipment.get(&handle) else {
            return format!("{name} failure: Invalid object handle");
        };
        match procedure {
            Procedure::GetObjTags => e.tags.join(","),
            Procedure::GetObjMemo => e.memo.clone(),
            Procedure::GetObjGUID => format!("{{00000000-0000-0000-0000-{:012X}}}", handle.0),
            Procedure::GetObjJournalRecord => e.journal.join("\n"),
            _ => String::new(),
        }
    }

    fn set_object_text(&mut self, procedure: Procedure, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        let text = text_at(args, 1);
        let Some(e) = self.equipment.get_mut(&handle) else {
            return self.fail(format!("{} failure: Invalid object handle", procedure.name()));
        };
        if procedure == Procedure::SetObjTags {
            e.tags = text
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        } else {
            e.memo = text;
        }
        OK
    }

    fn get_udf(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        let field = text_at(args, 1);
        let value = self
            .equipment
            .get(&handle)
            .and_then(|e| e.udfs.iter().find(|(f, _)| *f == field))
            .map(|(_, v)| v.clone());
        match value {
            Some(v) => {
                write_text(args, 2, &v);
                OK
            }
            None => self.fail(format!("User defined field {field} not found")),
        }
    }

    fn get_udf_by_index(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        let index = int_at(args, 1);
        let entry = self
            .equipment
            .get(&handle)
            .and_then(|e| usize::try_from(index).ok().and_then(|i| e.udfs.get(i)))
            .cloned();
        match entry {
            Some((f, v)) => {
                write_text(args, 2, &f);
                write_text(args, 3, &v);
                OK
            }
            None => self.fail(format!("User defined field index {index} out of range")),
        }
    }

    fn set_udf(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let handle = Handle(int_at(args, 0));
        let field = text_at(args, 1);
        let value = text_at(args, 2);
        let slot = self
            .equipment
            .get_mut(&handle)
            .and_then(|e| e.udfs.iter_mut().find(|(f, _)| *f == field));
        match slot {
            Some((_, v)) => {
                *v = value;
                OK
            }
            None => self.fail(format!("User defined field {field} not found")),
        }
    }

    fn print_1lpf(&self, handle: Handle) -> Option<String> {
        let e = self.equipment.get(&handle)?;
        Some(match e.kind {
            EquipmentType::BUS => format!(
                "[BUS] '{}' {}kV",
                e.text(BUS_S_NAME),
                e.double(BUS_D_KV_NOMINAL)
            ),
            EquipmentType::LINE => format!(
                "[LINE] '{}'-'{}' {} L",
                self.bus_label(Handle(e.integer(LN_N_BUS1_HND))),
                self.bus_label(Handle(e.integer(LN_N_BUS2_HND))),
                e.text(LN_S_ID)
            ),
            kind => format!("[{kind}] #{}", handle.0),
        })
    }

    fn find_1lpf(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let id = text_at(args, 0);
        let found = self
            .equipment
            .keys()
            .copied()
            .find(|h| self.print_1lpf(*h).as_deref() == Some(id.as_str()));
        match found {
            Some(h) => {
                write_bytes(args, 1, &codec::encode_i32(h.0));
                OK
            }
            None => self.fail(format!("Object {id} not found")),
        }
    }

    fn full_name(&self, procedure: Procedure, handle: Handle) -> String {
        let Some(e) = self.equipment.get(&handle) else {
            return String::new();
        };
        match (procedure, e.kind) {
            (Procedure::FullBusName, EquipmentType::BUS) => self.bus_label(handle),
            (Procedure::FullBranchName, EquipmentType::LINE) => format!(
                "{} - {} {} L",
                self.bus_label(Handle(e.integer(LN_N_BUS1_HND))),
                self.bus_label(Handle(e.integer(LN_N_BUS2_HND))),
                e.text(LN_S_ID)
            ),
            (Procedure::FullBranchName, EquipmentType::BRANCH) => {
                let line = Handle(e.integer(BR_N_HANDLE));
                self.full_name(Procedure::FullBranchName, line)
            }
            (Procedure::FullRelayName, _) if self.relay_times.contains_key(&handle) => {
                self.relay_id(handle)
            }
            _ => String::new(),
        }
    }

    fn run_1lpf_command(&mut self, args: &mut [Arg<'_>]) -> i32 {
        let command = text_at(args, 0);
        let trimmed = command.trim();
        if !(trimmed.starts_with('<') && trimmed.ends_with('>')) {
            return self.fail("Run1LPFCommand: invalid XML command");
        }
        OK
    }
}

impl NativeEngine for SimulatedEngine {
    fn invoke(&mut self, procedure: Procedure, args: &mut [Arg<'_>]) -> i32 {
        assert!(!self.released, "{} called after release", procedure.name());
        self.probe.enter(procedure);
        if let Some(delay) = self.call_delay {
            std::thread::sleep(delay);
        }
        use Procedure::*;
        let rc = match procedure {
            VersionInfo => self.version_info(args),
            LoadDataFile => self.load_data_file(args),
            SaveDataFile => self.save_data_file(args),
            CloseDataFile => self.close_data_file(),
            ReadChangeFile => self.read_change_file(args),
            GetEquipment => self.get_equipment(args),
            GetBusEquipment => self.get_bus_equipment(args),
            FindEquipmentByTag => self.find_equipment_by_tag(args),
            GetRelay => self.get_relay(args),
            GetLogicScheme => self.get_logic_scheme(args),
            DeleteEquipment => self.delete_equipment(args),
            EquipmentType => self.equipment_type(args),
            GetData => self.get_data(args),
            SetDataEx => self.set_data(args),
            PostData => self.post_data(args),
            FindBusByName => self.find_bus_by_name(args),
            FindBusNo => self.find_bus_no(args),
            BoundaryEquivalent => self.boundary_equivalent(args),
            MakeOutageList => self.make_outage_list(args),
            DoFault => self.do_fault(args),
            PickFault => self.pick_fault(args),
            GetPSCVoltage => self.psc_voltage(args),
            GetSCVoltage => self.sc_values(args, false),
            GetSCCurrent => self.sc_values(args, true),
            DoSteppedEvent => self.do_stepped_event(args),
            GetSteppedEvent => self.get_stepped_event(args),
            GetRelayTime => self.relay_time(args),
            ComputeRelayTime => self.compute_relay_time(args),
            SetObjTags | SetObjMemo => self.set_object_text(procedure, args),
            GetObjUDF => self.get_udf(args),
            GetObjUDFByIndex => self.get_udf_by_index(args),
            SetObjUDF => self.set_udf(args),
            FindObj1LPF => self.find_1lpf(args),
            Run1LPFCommand => self.run_1lpf_command(args),
            text => self.fail(format!("{} returns text", text.name())),
        };
        self.probe.exit();
        rc
    }

    fn invoke_text(&mut self, procedure: Procedure, args: &mut [Arg<'_>]) -> String {
        assert!(!self.released, "{} called after release", procedure.name());
        self.probe.enter(procedure);
        use Procedure::*;
        let text = match procedure {
            ErrorString => self.last_error.clone(),
            GetOlrFileName => self.open_file.clone().unwrap_or_default(),
            FaultDescriptionEx => self.fault_description(args),
            GetObjTags | GetObjMemo | GetObjGUID | GetObjJournalRecord => {
                self.object_text(procedure, args)
            }
            PrintObj1LPF => {
                let handle = Handle(int_at(args, 0));
                self.print_1lpf(handle)
                    .unwrap_or_else(|| "PrintObj1LPF failure: Invalid object handle".to_string())
            }
            GetAreaName | GetZoneName => {
                let number = int_at(args, 0);
                let names = if procedure == GetAreaName { &self.areas } else { &self.zones };
                names
                    .get(&number)
                    .cloned()
                    .unwrap_or_else(|| format!("{} failure: {number} not found", procedure.name()))
            }
            FullBusName | FullBranchName | FullRelayName => {
                self.full_name(procedure, Handle(int_at(args, 0)))
            }
            other => format!("{} failure: does not return text", other.name()),
        };
        self.probe.exit();
        text
    }

    fn release(&mut self) {
        self.released = true;
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
    }
}

fn int_at(args: &[Arg<'_>], i: usize) -> i32 {
    match args.get(i) {
        Some(Arg::Int(v)) => *v,
        Some(Arg::Word(w)) => *w as i32,
        Some(Arg::Out(b)) if b.len() >= codec::INT_SIZE => codec::decode_i32(b),
        _ => 0,
    }
}

fn double_at(args: &[Arg<'_>], i: usize) -> f64 {
    match (args.get(i), args.get(i + 1)) {
        (Some(Arg::Word(lo)), Some(Arg::Word(hi))) => codec::join_words([*lo, *hi]),
        _ => f64::NAN,
    }
}

fn bytes_at<'s>(args: &'s [Arg<'_>], i: usize) -> &'s [u8] {
    match args.get(i) {
        Some(Arg::In(b)) => &b[..],
        Some(Arg::Out(b)) => &b[..],
        _ => &[],
    }
}

fn text_at(args: &[Arg<'_>], i: usize) -> String {
    codec::decode_str(bytes_at(args, i))
}

fn write_bytes(args: &mut [Arg<'_>], i: usize, bytes: &[u8]) {
    if let Some(Arg::Out(buf)) = args.get_mut(i) {
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
    }
}

/// Writes NUL-terminated text, truncated to the buffer.
fn write_text(args: &mut [Arg<'_>], i: usize, text: &str) {
    if let Some(Arg::Out(buf)) = args.get_mut(i) {
        if buf.is_empty() {
            return;
        }
        let bytes: Vec<u8> = text.bytes().filter(|&b| b != 0).collect();
        let n = bytes.len().min(buf.len() - 1);
        buf[..n].copy_from_slice(&bytes[..n]);
        buf[n] = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out_i32(sim: &mut SimulatedEngine, procedure: Procedure, mut args: Vec<Arg<'_>>) -> i32 {
        sim.invoke(procedure, &mut args)
    }

    #[test]
    fn test_enumeration_ends_with_sentinel() {
        let mut sim = SimulatedEngine::sample();
        let mut hnd = [0u8; 4];
        let mut seen = Vec::new();
        loop {
            let rc = sim.invoke(
                Procedure::GetEquipment,
                &mut [Arg::Int(EquipmentType::BUS.0), Arg::Out(&mut hnd)],
            );
            if rc == SENTINEL {
                break;
            }
            assert_eq!(rc, OK);
            seen.push(codec::decode_i32(&hnd));
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_failure_sets_error_string() {
        let mut sim = SimulatedEngine::new();
        let rc = out_i32(&mut sim, Procedure::FindBusNo, vec![Arg::Int(42)]);
        assert_eq!(rc, FAILURE);
        assert_eq!(
            sim.invoke_text(Procedure::ErrorString, &mut []),
            "Bus number 42 not found"
        );
    }

    #[test]
    fn test_pick_codes() {
        let mut sim = SimulatedEngine::sample();
        let bus = Handle(sim.invoke(Procedure::FindBusNo, &mut [Arg::Int(1)]));
        let conn = codec::encode_i32_array(&[1, 0, 1, 0]);
        let opts = codec::encode_f64_array(&[1.0; 15]);
        let outage_opts = codec::encode_i32_array(&[0; 4]);
        let outages = codec::encode_i32_array(&[0]);
        let [r0, r1] = Arg::double(0.0);
        let [x0, x1] = Arg::double(0.0);
        let rc = sim.invoke(
            Procedure::DoFault,
            &mut [
                Arg::Int(bus.0),
                Arg::In(&conn),
                Arg::In(&opts),
                Arg::In(&outage_opts),
                Arg::In(&outages),
                r0,
                r1,
                x0,
                x1,
                Arg::Int(1),
            ],
        );
        assert_eq!(rc, OK);
        // 12 enabled options times two connections
        assert_eq!(sim.faults.len(), 24);

        let mut pick = |code| sim.invoke(Procedure::PickFault, &mut [Arg::Int(code), Arg::Int(9)]);
        assert_eq!(pick(-4), FAILURE);
        assert_eq!(pick(-2), OK);
        assert_eq!(pick(-1), OK);
        assert_eq!(pick(-2), FAILURE);
        assert_eq!(pick(-4), OK);
        assert_eq!(pick(25), FAILURE);
        assert_eq!(pick(1), OK);
    }

    #[test]
    fn test_staged_write_invisible_until_post() {
        let mut sim = SimulatedEngine::sample();
        let bus = Handle(sim.invoke(Procedure::FindBusNo, &mut [Arg::Int(2)]));
        let value = codec::encode_str("TEXAS").unwrap();
        let rc = sim.invoke(
            Procedure::SetDataEx,
            &mut [Arg::Int(bus.0), Arg::Int(BUS_S_NAME.0), Arg::In(&value)],
        );
        assert_eq!(rc, OK);
        assert_eq!(sim.equipment[&bus].text(BUS_S_NAME), "OHIO");
        assert_eq!(sim.invoke(Procedure::PostData, &mut [Arg::Int(bus.0)]), OK);
        assert_eq!(sim.equipment[&bus].text(BUS_S_NAME), "TEXAS");
    }

    #[test]
    fn test_probe_counts_calls() {
        let mut sim = SimulatedEngine::new();
        let probe = sim.probe();
        sim.invoke(Procedure::FindBusNo, &mut [Arg::Int(1)]);
        sim.invoke_text(Procedure::ErrorString, &mut []);
        assert_eq!(probe.count(Procedure::FindBusNo), 1);
        assert_eq!(probe.count(Procedure::ErrorString), 1);
        assert_eq!(probe.total(), 2);
        assert_eq!(probe.max_concurrent(), 1);
    }

    #[test]
    fn test_write_text_truncates_with_terminator() {
        let mut buf = [0xFFu8; 4];
        write_text(&mut [Arg::Out(&mut buf)], 0, "ABCDEFG");
        assert_eq!(&buf, b"ABC\0");
    }
}

//! Engine schema identifiers: equipment type codes, special handles, field
//! tokens and the fixed sizes the engine documents for its arrays.
//!
//! A token encodes the kind of its field in `token / 100`; the numbering of
//! the field tokens below follows the engine's schema for the supported
//! build and must be revalidated against newer builds.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Kind of a field, as encoded in `token / 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Double,
    Integer,
    TextArray,
    DoubleArray,
    IntegerArray,
}

impl FieldKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(FieldKind::Text),
            2 => Some(FieldKind::Double),
            3 => Some(FieldKind::Integer),
            4 => Some(FieldKind::TextArray),
            5 => Some(FieldKind::DoubleArray),
            6 => Some(FieldKind::IntegerArray),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            FieldKind::Text => 1,
            FieldKind::Double => 2,
            FieldKind::Integer => 3,
            FieldKind::TextArray => 4,
            FieldKind::DoubleArray => 5,
            FieldKind::IntegerArray => 6,
        }
    }

    /// Kinds whose element count must come from the array length table.
    pub fn needs_length(self) -> bool {
        matches!(self, FieldKind::DoubleArray | FieldKind::IntegerArray)
    }
}

/// Field identifier on an equipment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub i32);

impl Token {
    pub fn kind(self) -> Option<FieldKind> {
        FieldKind::from_code(self.0 / 100)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to an equipment item or result inside the loaded model.
///
/// Handles are only meaningful while the model that produced them stays
/// loaded, and deleting equipment may renumber them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(pub i32);

impl Handle {
    /// The system object.
    pub const SYSTEM: Handle = Handle(1);
    /// The power flow solution object.
    pub const POWER_FLOW: Handle = Handle(2);
    /// The short circuit solution; `GetSCCurrent` on it yields total fault current.
    pub const SHORT_CIRCUIT: Handle = Handle(3);

    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Equipment type code. Several relay families share codes in the engine,
/// so this is a code newtype rather than an enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquipmentType(pub i32);

impl EquipmentType {
    pub const NOTHING: EquipmentType = EquipmentType(0);
    pub const BUS: EquipmentType = EquipmentType(1);
    pub const LOAD: EquipmentType = EquipmentType(2);
    pub const LOAD_UNIT: EquipmentType = EquipmentType(3);
    pub const SHUNT: EquipmentType = EquipmentType(4);
    pub const SHUNT_UNIT: EquipmentType = EquipmentType(5);
    pub const GEN: EquipmentType = EquipmentType(6);
    pub const GEN_UNIT: EquipmentType = EquipmentType(7);
    pub const SVD: EquipmentType = EquipmentType(8);
    pub const BRANCH: EquipmentType = EquipmentType(9);
    pub const LINE: EquipmentType = EquipmentType(10);
    pub const XFMR: EquipmentType = EquipmentType(11);
    pub const XFMR3: EquipmentType = EquipmentType(12);
    pub const PHASE_SHIFTER: EquipmentType = EquipmentType(13);
    pub const SERIES_CAP: EquipmentType = EquipmentType(14);
    pub const MUTUAL: EquipmentType = EquipmentType(15);
    pub const AREA: EquipmentType = EquipmentType(16);
    pub const ZONE: EquipmentType = EquipmentType(17);
    pub const NOTE: EquipmentType = EquipmentType(18);
    pub const SYSTEM: EquipmentType = EquipmentType(19);
    pub const RELAY_GROUP: EquipmentType = EquipmentType(20);
    pub const RELAY_OC_GROUND: EquipmentType = EquipmentType(21);
    pub const RELAY_OC_PHASE: EquipmentType = EquipmentType(22);
    pub const RELAY_DS_GROUND: EquipmentType = EquipmentType(23);
    pub const RELAY_DS_PHASE: EquipmentType = EquipmentType(24);
    pub const FUSE: EquipmentType = EquipmentType(25);
    pub const POWER_FLOW: EquipmentType = EquipmentType(26);
    pub const SHORT_CIRCUIT: EquipmentType = EquipmentType(27);
    pub const SWITCH: EquipmentType = EquipmentType(28);
    pub const RECLOSER_PHASE: EquipmentType = EquipmentType(29);
    pub const RECLOSER_GROUND: EquipmentType = EquipmentType(30);
    pub const SCHEME: EquipmentType = EquipmentType(31);
    pub const BREAKER: EquipmentType = EquipmentType(32);
    pub const CC_GEN: EquipmentType = EquipmentType(33);
    pub const RELAY_DIFF: EquipmentType = EquipmentType(34);
    pub const RELAY_VOLTAGE: EquipmentType = EquipmentType(35);
    pub const PILOT: EquipmentType = EquipmentType(36);
    pub const Z_CORRECT: EquipmentType = EquipmentType(37);
    pub const BLOB: EquipmentType = EquipmentType(38);
    pub const DC_LINE: EquipmentType = EquipmentType(39);
    pub const LINE_KINK: EquipmentType = EquipmentType(40);
    pub const RELAY_LINK: EquipmentType = EquipmentType(41);
    pub const LTC: EquipmentType = EquipmentType(42);
    pub const LTC3: EquipmentType = EquipmentType(43);
    pub const SETTINGS: EquipmentType = EquipmentType(44);
    pub const PICKED: EquipmentType = EquipmentType(100);
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Array sizes the engine documents.
pub const MAX_MESSAGE_LEN: usize = 512;
pub const MAX_PATH: usize = 260;
pub const MAX_DS_PARAMS: usize = 255;
pub const MAX_ZONES: usize = 8;
pub const MAX_CCV: usize = 10;
pub const MAX_SBKF: usize = 10;

// Bus fields.
pub const BUS_S_NAME: Token = Token(101);
pub const BUS_S_LOCATION: Token = Token(102);
pub const BUS_S_COMMENT: Token = Token(103);
pub const BUS_D_KV_NOMINAL: Token = Token(201);
pub const BUS_D_KVP: Token = Token(202);
pub const BUS_D_ANGP: Token = Token(203);
pub const BUS_N_NUMBER: Token = Token(301);
pub const BUS_N_AREA: Token = Token(302);
pub const BUS_N_ZONE: Token = Token(303);
pub const BUS_N_TAP_BUS: Token = Token(304);

// Line fields.
pub const LN_S_ID: Token = Token(111);
pub const LN_S_NAME: Token = Token(112);
pub const LN_S_LENGTH_UNIT: Token = Token(113);
pub const LN_D_R: Token = Token(211);
pub const LN_D_X: Token = Token(212);
pub const LN_D_R0: Token = Token(213);
pub const LN_D_X0: Token = Token(214);
pub const LN_D_LENGTH: Token = Token(219);
pub const LN_N_BUS1_HND: Token = Token(311);
pub const LN_N_BUS2_HND: Token = Token(312);
pub const LN_N_IN_SERVICE: Token = Token(313);
pub const LN_N_RLY_GR1_HND: Token = Token(314);
pub const LN_N_RLY_GR2_HND: Token = Token(315);
pub const LN_N_MU_PAIR_HND: Token = Token(316);
pub const LN_V_D_RATING: Token = Token(511);

// Branch fields.
pub const BR_N_BUS1_HND: Token = Token(321);
pub const BR_N_BUS2_HND: Token = Token(322);
pub const BR_N_HANDLE: Token = Token(323);
pub const BR_N_TYPE: Token = Token(324);

// Transformer, phase shifter, series capacitor and switch fields.
pub const XR_S_ID: Token = Token(131);
pub const XR_V_D_RATING: Token = Token(531);
pub const X3_S_ID: Token = Token(135);
pub const PS_S_ID: Token = Token(136);
pub const SC_S_ID: Token = Token(137);
pub const SW_S_ID: Token = Token(138);

// Relay group and relay fields.
pub const RG_S_NOTE: Token = Token(141);
pub const RG_V_N_PRIMARY: Token = Token(641);
pub const OG_S_ID: Token = Token(151);
pub const DG_S_ID: Token = Token(161);
pub const DG_V_D_PARAMS: Token = Token(561);
pub const DP_S_ID: Token = Token(171);
pub const DP_V_D_PARAMS: Token = Token(571);

// Breaker fields.
pub const BK_S_NAME: Token = Token(181);
pub const BK_V_S_PROTECTED: Token = Token(481);
pub const BK_V_N_OPS: Token = Token(681);

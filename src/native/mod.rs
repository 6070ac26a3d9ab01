//! # Native procedure table
//!
//! Every procedure the bridge calls, its return convention, and the
//! [`NativeEngine`] seam the [`crate::gate::CallGate`] drives. Two engines
//! implement the seam: [`LibraryEngine`] over the real shared library, and
//! (with the `sim` feature) [`SimulatedEngine`] over an in-memory model.
//!
//! Arguments cross the seam as machine words exactly as the library receives
//! them: a `double` passed by value occupies two [`Arg::Word`]s produced by
//! [`crate::codec::split_words`].

use strum::{EnumIter, IntoStaticStr};

pub mod library;
#[cfg(feature = "sim")]
pub mod simulated;

pub use library::LibraryEngine;
#[cfg(feature = "sim")]
pub use simulated::SimulatedEngine;

/// Return code for success.
pub const OK: i32 = 1;
/// Return code for failure; the reason is then available from `ErrorString`.
pub const FAILURE: i32 = 0;
/// Return code of the "get next" procedures once the sequence is exhausted.
pub const SENTINEL: i32 = -1;

/// How a procedure's return value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// [`OK`] or [`FAILURE`].
    Status,
    /// [`OK`], [`FAILURE`] or [`SENTINEL`].
    Sentinel,
    /// The result itself; [`FAILURE`] signals an error.
    Value,
    /// A pointer to NUL-terminated text owned by the library.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
pub enum Procedure {
    ErrorString,
    VersionInfo,
    SaveDataFile,
    LoadDataFile,
    GetOlrFileName,
    CloseDataFile,
    ReadChangeFile,
    GetEquipment,
    DeleteEquipment,
    EquipmentType,
    GetData,
    SetDataEx,
    PostData,
    FindBusByName,
    FindEquipmentByTag,
    FindBusNo,
    GetBusEquipment,
    BoundaryEquivalent,
    MakeOutageList,
    DoFault,
    FaultDescriptionEx,
    DoSteppedEvent,
    GetSteppedEvent,
    GetRelay,
    GetRelayTime,
    ComputeRelayTime,
    GetLogicScheme,
    GetObjTags,
    SetObjTags,
    GetObjMemo,
    SetObjMemo,
    GetObjGUID,
    GetObjJournalRecord,
    GetObjUDF,
    GetObjUDFByIndex,
    SetObjUDF,
    FindObj1LPF,
    PrintObj1LPF,
    GetAreaName,
    GetZoneName,
    PickFault,
    GetPSCVoltage,
    GetSCVoltage,
    GetSCCurrent,
    Run1LPFCommand,
    FullBusName,
    FullBranchName,
    FullRelayName,
}

impl Procedure {
    /// Short name used in errors and logs.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Exported symbol in the shared library.
    pub fn symbol(self) -> String {
        format!("OlxAPI{}", self.name())
    }

    pub fn convention(self) -> Convention {
        use Procedure::*;
        match self {
            GetEquipment | FindEquipmentByTag | GetBusEquipment | GetRelay | GetLogicScheme => {
                Convention::Sentinel
            }
            EquipmentType | FindBusNo => Convention::Value,
            ErrorString | GetOlrFileName | FaultDescriptionEx | GetObjTags | GetObjMemo
            | GetObjGUID | GetObjJournalRecord | PrintObj1LPF | GetAreaName | GetZoneName
            | FullBusName | FullBranchName | FullRelayName => Convention::Text,
            _ => Convention::Status,
        }
    }

    /// Number of argument words the procedure takes.
    pub fn arity(self) -> usize {
        use Procedure::*;
        match self {
            ErrorString | GetOlrFileName | CloseDataFile => 0,
            VersionInfo | SaveDataFile | ReadChangeFile | DeleteEquipment | EquipmentType
            | PostData | FindBusNo | GetObjTags | GetObjMemo | GetObjGUID
            | GetObjJournalRecord | PrintObj1LPF | GetAreaName | GetZoneName
            | Run1LPFCommand | FullBusName | FullBranchName | FullRelayName => 1,
            LoadDataFile | GetEquipment | FaultDescriptionEx | GetRelay | GetLogicScheme
            | SetObjTags | SetObjMemo | FindObj1LPF | PickFault => 2,
            GetData | SetDataEx | FindEquipmentByTag | GetBusEquipment | BoundaryEquivalent
            | GetObjUDF | SetObjUDF => 3,
            FindBusByName | DoSteppedEvent | GetObjUDFByIndex | GetPSCVoltage | GetSCVoltage
            | GetSCCurrent => 4,
            MakeOutageList => 5,
            GetRelayTime | GetSteppedEvent => 6,
            DoFault => 10,
            ComputeRelayTime => 11,
        }
    }
}

/// One argument word.
#[derive(Debug)]
pub enum Arg<'a> {
    Int(i32),
    /// Half of a split double, or any other raw 32-bit word.
    Word(u32),
    In(&'a [u8]),
    Out(&'a mut [u8]),
    Null,
}

impl<'a> Arg<'a> {
    /// The two words of a double passed by value, low word first.
    pub fn double(value: f64) -> [Arg<'a>; 2] {
        let [lo, hi] = crate::codec::split_words(value);
        [Arg::Word(lo), Arg::Word(hi)]
    }

    pub fn flag(value: bool) -> Arg<'a> {
        Arg::Int(i32::from(value))
    }
}

/// Word-level access to the engine.
///
/// Implementations are not required to tolerate concurrent or reentrant
/// calls; [`crate::gate::CallGate`] guarantees neither happens.
pub trait NativeEngine: Send {
    /// Calls a non-text procedure and returns its raw result.
    fn invoke(&mut self, procedure: Procedure, args: &mut [Arg<'_>]) -> i32;

    /// Calls a [`Convention::Text`] procedure and copies the returned text.
    fn invoke_text(&mut self, procedure: Procedure, args: &mut [Arg<'_>]) -> String;

    /// Unloads the engine. No call follows.
    fn release(&mut self);
}

//! # Session
//!
//! [`Session`] is the caller-facing handle on one loaded engine. It is cheap
//! to clone; every clone shares the same [`CallGate`], so calls from any
//! clone on any thread are serialized against each other.
//!
//! Operations are grouped by concern across the submodules:
//!
//! - `equipment`: lookups, enumeration cursors and network reduction
//! - `data`: token-addressed field access
//! - `fault`: fault runs, result picking and short circuit queries
//! - `relay`: relay enumeration and operating times
//! - `annotations`: tags, memos, user defined fields and naming

mod annotations;
mod data;
mod equipment;
mod fault;
mod relay;

pub use annotations::Journal;

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::codec;
use crate::config::Config;
use crate::data::ArrayLengths;
use crate::error::{BridgeError, Result};
use crate::gate::{CallGate, FaultState};
use crate::native::{Arg, LibraryEngine, NativeEngine, Procedure};

/// Engine version this crate's schema tables were checked against.
pub const SUPPORTED_VERSION: &str = "15.4";
/// Oldest engine build this crate's schema tables were checked against.
pub const SUPPORTED_BUILD: u32 = 17321;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Supported {
    version: String,
    build: u32,
}

/// A loaded engine. See the module documentation.
#[derive(Clone)]
pub struct Session {
    gate: Arc<CallGate>,
    schema: Arc<ArrayLengths>,
    supported: Arc<Supported>,
}

impl Session {
    /// Loads the configured library and resolves every procedure.
    ///
    /// Any load failure is returned and no session exists.
    pub fn open(config: &Config) -> Result<Self> {
        let schema = config.schema.array_lengths()?;
        let engine = LibraryEngine::load(&config.engine.library_path())?;
        let session = Self::with_engine(Box::new(engine), schema)
            .with_supported(&config.engine.supported_version, config.engine.supported_build);
        if let Err(err) = session.check_supported() {
            warn!(error = %err, "could not determine engine build");
        }
        Ok(session)
    }

    /// Wraps an already loaded engine.
    pub fn with_engine(engine: Box<dyn NativeEngine>, schema: ArrayLengths) -> Self {
        Self {
            gate: Arc::new(CallGate::new(engine)),
            schema: Arc::new(schema),
            supported: Arc::new(Supported {
                version: SUPPORTED_VERSION.to_string(),
                build: SUPPORTED_BUILD,
            }),
        }
    }

    pub fn with_supported(mut self, version: &str, build: u32) -> Self {
        self.supported = Arc::new(Supported {
            version: version.to_string(),
            build,
        });
        self
    }

    /// Unloads the engine for every clone of this session. Calling it again
    /// only logs a warning; any other call afterwards panics.
    pub fn release(&self) {
        self.gate.release();
    }

    pub fn is_released(&self) -> bool {
        self.gate.is_released()
    }

    pub fn fault_state(&self) -> FaultState {
        self.gate.fault_state()
    }

    pub fn schema(&self) -> &ArrayLengths {
        &self.schema
    }

    /// The engine's version banner, e.g. `ASPEN OlxAPI 15.4 Build 17500`.
    pub fn info(&self) -> Result<String> {
        let mut buf = vec![0u8; codec::VERSION_INFO_LEN];
        self.status(Procedure::VersionInfo, &mut [Arg::Out(&mut buf)])?;
        Ok(codec::decode_str(&buf))
    }

    pub fn version(&self) -> Result<String> {
        banner_token(&self.info()?, 2, "version")
    }

    pub fn build_number(&self) -> Result<u32> {
        let token = banner_token(&self.info()?, 4, "build number")?;
        token
            .parse()
            .map_err(|_| BridgeError::Encoding(format!("invalid build number {token:?}")))
    }

    /// Whether the engine build is at least the supported one. An older build
    /// is logged and still usable.
    pub fn check_supported(&self) -> Result<bool> {
        let build = self.build_number()?;
        if build < self.supported.build {
            warn!(
                build,
                supported_build = self.supported.build,
                supported_version = %self.supported.version,
                "engine build is older than the supported build"
            );
            return Ok(false);
        }
        Ok(true)
    }

    pub fn save_data_file(&self, name: &str) -> Result<()> {
        let name_buf = codec::encode_str(name)?;
        self.status(Procedure::SaveDataFile, &mut [Arg::In(&name_buf)])?;
        info!(file = name, "model saved");
        Ok(())
    }

    pub fn load_data_file(&self, name: &str) -> Result<()> {
        self.load(name, false)
    }

    pub fn load_data_file_read_only(&self, name: &str) -> Result<()> {
        self.load(name, true)
    }

    fn load(&self, name: &str, read_only: bool) -> Result<()> {
        let name_buf = codec::encode_str(name)?;
        self.gate.exclusive(|inv| -> Result<()> {
            let outcome = inv.invoke(
                Procedure::LoadDataFile,
                &mut [Arg::In(&name_buf), Arg::flag(read_only)],
            );
            // Results of an earlier model no longer apply.
            inv.fault_mut().reset();
            outcome.require(Procedure::LoadDataFile.name()).map(drop)
        })?;
        info!(file = name, read_only, "model loaded");
        Ok(())
    }

    /// Name of the open model file, empty when none is open.
    pub fn olr_filename(&self) -> String {
        self.gate.invoke_text(Procedure::GetOlrFileName, &mut [])
    }

    pub fn close_data_file(&self) -> Result<()> {
        self.gate.exclusive(|inv| -> Result<()> {
            let outcome = inv.invoke(Procedure::CloseDataFile, &mut []);
            inv.fault_mut().reset();
            outcome.require(Procedure::CloseDataFile.name()).map(drop)
        })?;
        info!("model closed");
        Ok(())
    }

    /// Applies a `.chf` change file to the open model.
    pub fn read_change_file(&self, name: &str) -> Result<()> {
        let name_buf = codec::encode_str(name)?;
        self.status(Procedure::ReadChangeFile, &mut [Arg::In(&name_buf)])
    }

    // Call helpers shared by the submodules.

    fn status(&self, procedure: Procedure, args: &mut [Arg<'_>]) -> Result<()> {
        self.gate.invoke(procedure, args).require(procedure.name()).map(drop)
    }

    fn value(&self, procedure: Procedure, args: &mut [Arg<'_>]) -> Result<i32> {
        self.gate.invoke(procedure, args).require(procedure.name())
    }

    /// Text procedures report failure in-band as `"<Name> failure: ..."`.
    fn checked_text(&self, procedure: Procedure, args: &mut [Arg<'_>]) -> Result<String> {
        let text = self.gate.invoke_text(procedure, args);
        check_text(procedure, text)
    }
}

fn check_text(procedure: Procedure, text: String) -> Result<String> {
    let prefix = format!("{} failure:", procedure.name());
    match text.strip_prefix(&prefix) {
        Some(message) => {
            let message = message.trim();
            warn!(procedure = procedure.name(), message, "native call failed");
            Err(BridgeError::native(procedure.name(), message))
        }
        None => Ok(text),
    }
}

fn banner_token(info: &str, index: usize, what: &str) -> Result<String> {
    info.split(' ')
        .nth(index)
        .map(str::to_string)
        .ok_or_else(|| BridgeError::Encoding(format!("unable to parse engine {what} from {info:?}")))
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("released", &self.gate.is_released())
            .field("fault_state", &self.gate.fault_state())
            .field("array_lengths", &self.schema.len())
            .field("supported_build", &self.supported.build)
            .finish()
    }
}


#[cfg(all(test, feature = "sim"))]
mod sim_tests {
    use super::*;
    use crate::native::SimulatedEngine;

    fn session(sim: SimulatedEngine) -> Session {
        Session::with_engine(Box::new(sim), ArrayLengths::default())
    }

    #[test]
    fn test_version_and_build() {
        let s = session(SimulatedEngine::sample());
        assert_eq!(s.version().unwrap(), "15.4");
        assert_eq!(s.build_number().unwrap(), 17500);
        assert_eq!(s.check_supported(), Ok(true));
    }

    #[test]
    fn test_old_build_is_flagged() {
        let s = session(SimulatedEngine::sample().with_version("ASPEN OlxAPI 15.2 Build 16000"));
        assert_eq!(s.check_supported(), Ok(false));
    }

    #[test]
    fn test_model_file_lifecycle() {
        let s = session(SimulatedEngine::sample());
        assert_eq!(s.olr_filename(), "");
        let err = s.load_data_file("MISSING.OLR").unwrap_err();
        assert!(err.is_native());

        s.load_data_file("SAMPLE.OLR").unwrap();
        assert_eq!(s.olr_filename(), "SAMPLE.OLR");
        s.read_change_file("changes.chf").unwrap();
        assert!(s.read_change_file("changes.txt").is_err());
        s.save_data_file("COPY.OLR").unwrap();
        s.close_data_file().unwrap();
        assert!(s.close_data_file().is_err());
        s.load_data_file("COPY.OLR").unwrap();
    }

    #[test]
    fn test_read_only_model_cannot_overwrite() {
        let s = session(SimulatedEngine::sample());
        s.load_data_file_read_only("SAMPLE.OLR").unwrap();
        assert!(s.save_data_file("SAMPLE.OLR").is_err());
        s.save_data_file("OTHER.OLR").unwrap();
    }

    #[test]
    fn test_nul_in_file_name_never_reaches_engine() {
        let sim = SimulatedEngine::sample();
        let probe = sim.probe();
        let s = session(sim);
        let err = s.load_data_file("BAD\0.OLR").unwrap_err();
        assert!(matches!(err, BridgeError::Encoding(_)));
        assert_eq!(probe.total(), 0);
    }
}

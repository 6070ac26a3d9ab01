//! # oneliner-bridge
//!
//! Serialized, state-checked access to the OneLiner short circuit engine
//! library (`olxapi`). The engine is a stateful, non-reentrant procedure
//! library addressed through opaque integer handles; this crate
//!
//! - marshals values across the call boundary ([`codec`]),
//! - puts every call behind one lock and turns failure codes into errors
//!   carrying the engine's message ([`gate`]),
//! - mirrors the engine's fault-analysis state so result queries are refused
//!   before there is anything to query ([`gate::FaultState`]),
//! - walks engine-held sequences with cursors ([`cursor`]),
//! - and converts between phase and sequence quantities ([`phasor`]).
//!
//! [`Session`] is the entry point. With the default `sim` feature,
//! [`native::SimulatedEngine`] stands in for the vendor library.

pub mod codec;
pub mod config;
pub mod cursor;
pub mod data;
pub mod error;
pub mod fault;
pub mod gate;
pub mod native;
pub mod phasor;
pub mod session;
pub mod telemetry;

pub use config::Config;
pub use cursor::{FaultCursor, HandleCursor, SteppedEventCursor};
pub use data::{DataRow, EquipmentType, FieldValue, Handle, Token};
pub use error::{BridgeError, Result};
pub use fault::{
    FaultConfig, FaultIndex, RelayOperation, RelayTimeInputs, ScStyle, ScValues,
    SteppedEvent, SteppedEventConfig,
};
pub use gate::FaultState;
pub use phasor::Phasor;
pub use session::{Journal, Session};

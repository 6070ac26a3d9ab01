//! # Token-addressed data access types
//!
//! Field tokens and equipment codes, the array length table, and the closed
//! set of values a field can decode to. The calls themselves live on
//! [`crate::Session`].

pub mod schema;
pub mod tokens;
pub mod value;

pub use schema::{ArrayLengthEntry, ArrayLengths};
pub use tokens::{EquipmentType, FieldKind, Handle, Token};
pub use value::{DataRow, FieldSlot, FieldValue};

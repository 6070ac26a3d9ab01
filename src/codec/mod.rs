//! # Call boundary codec
//!
//! Byte layouts the native engine expects: NUL-terminated text, 4-byte
//! little-endian integers, 8-byte little-endian doubles, packed arrays of
//! both, and the two-word form a double takes when it is passed as an
//! individual call argument.

pub mod numeric;
pub mod text;
pub mod words;

pub use numeric::*;
pub use text::*;
pub use words::{join_words, split_words};

pub const KIB: usize = 1 << 10;

/// C `int` size on the engine's side of the boundary.
pub const INT_SIZE: usize = 4;
/// C `double` size on the engine's side of the boundary.
pub const DOUBLE_SIZE: usize = 8;

// Output buffer sizes for fields whose length the engine does not report.
pub const STRING_FIELD_LEN: usize = 10 * KIB;
pub const VERSION_INFO_LEN: usize = 1028;
pub const MESSAGE_LEN: usize = 512;
pub const UDF_NAME_LEN: usize = 16;
pub const UDF_VALUE_LEN: usize = 64;
pub const RELAY_TEXT_LEN: usize = 128;
pub const EVENT_DESC_LEN: usize = 4 * 512;
pub const FAULT_DESC_LEN: usize = 50 * 512;

/// Upper bound when scanning text the engine returns by pointer.
pub const MAX_RETURNED_TEXT: usize = 64 * KIB;

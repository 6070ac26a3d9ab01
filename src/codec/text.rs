use std::ffi::{CStr, CString};

use crate::error::{BridgeError, Result};

/// Encodes `s` with a single trailing NUL.
///
/// Strings containing an interior NUL are rejected: the engine would stop
/// reading at it and silently truncate the value.
pub fn encode_str(s: &str) -> Result<Vec<u8>> {
    CString::new(s)
        .map(CString::into_bytes_with_nul)
        .map_err(|e| {
            BridgeError::Encoding(format!(
                "string contains a NUL byte at position {}",
                e.nul_position()
            ))
        })
}

/// Decodes the text in front of the first NUL of `buf`.
///
/// A buffer the engine filled completely (no NUL) decodes in full. Invalid
/// UTF-8 is replaced rather than rejected; the engine writes ANSI text.
pub fn decode_str(buf: &[u8]) -> String {
    match CStr::from_bytes_until_nul(buf) {
        Ok(s) => s.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(buf).into_owned(),
    }
}

/// Encodes `s` into a zero-padded buffer of exactly `len` bytes, as required
/// for fixed-width text arguments (user defined field names and values).
pub fn encode_fixed(s: &str, len: usize) -> Result<Vec<u8>> {
    let bytes = encode_str(s)?;
    if bytes.len() > len {
        return Err(BridgeError::Encoding(format!(
            "string of {} bytes does not fit a {} byte field",
            bytes.len() - 1,
            len
        )));
    }
    let mut buf = vec![0u8; len];
    buf[..bytes.len()].copy_from_slice(&bytes);
    Ok(buf)
}

/// Splits a tab-delimited string-array field.
pub fn decode_str_array(buf: &[u8]) -> Vec<String> {
    let s = decode_str(buf);
    if s.is_empty() {
        return Vec::new();
    }
    s.split('\t').map(str::to_string).collect()
}

/// Reads NUL-terminated text the engine returned by pointer.
///
/// The scan stops at the first NUL or after `max_len` bytes, whichever comes
/// first, and never touches memory past the terminator.
///
/// # Safety
///
/// `ptr` must be null or point to memory readable up to its NUL terminator
/// or `max_len` bytes.
pub unsafe fn read_terminated(ptr: *const u8, max_len: usize) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let mut bytes = Vec::new();
    for i in 0..max_len {
        let b = ptr.add(i).read();
        if b == 0 {
            break;
        }
        bytes.push(b);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

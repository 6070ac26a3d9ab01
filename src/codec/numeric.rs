//! Little-endian packing of the engine's `int` and `double` values.

use byteorder::{ByteOrder, LittleEndian};

use super::{DOUBLE_SIZE, INT_SIZE};

pub fn encode_i32(value: i32) -> [u8; INT_SIZE] {
    let mut buf = [0u8; INT_SIZE];
    LittleEndian::write_i32(&mut buf, value);
    buf
}

pub fn decode_i32(buf: &[u8]) -> i32 {
    LittleEndian::read_i32(&buf[..INT_SIZE])
}

pub fn encode_f64(value: f64) -> [u8; DOUBLE_SIZE] {
    let mut buf = [0u8; DOUBLE_SIZE];
    LittleEndian::write_f64(&mut buf, value);
    buf
}

pub fn decode_f64(buf: &[u8]) -> f64 {
    LittleEndian::read_f64(&buf[..DOUBLE_SIZE])
}

pub fn encode_i32_array(values: &[i32]) -> Vec<u8> {
    let mut buf = vec![0u8; values.len() * INT_SIZE];
    LittleEndian::write_i32_into(values, &mut buf);
    buf
}

/// Decodes as many whole `int`s as `buf` holds.
pub fn decode_i32_array(buf: &[u8]) -> Vec<i32> {
    let mut values = vec![0i32; buf.len() / INT_SIZE];
    LittleEndian::read_i32_into(&buf[..values.len() * INT_SIZE], &mut values);
    values
}

pub fn encode_f64_array(values: &[f64]) -> Vec<u8> {
    let mut buf = vec![0u8; values.len() * DOUBLE_SIZE];
    LittleEndian::write_f64_into(values, &mut buf);
    buf
}

/// Decodes as many whole `double`s as `buf` holds.
pub fn decode_f64_array(buf: &[u8]) -> Vec<f64> {
    let mut values = vec![0f64; buf.len() / DOUBLE_SIZE];
    LittleEndian::read_f64_into(&buf[..values.len() * DOUBLE_SIZE], &mut values);
    values
}

/// Encodes a handle list followed by the `-1` terminator the engine scans for.
pub fn encode_terminated_list(values: &[i32]) -> Vec<u8> {
    let mut buf = encode_i32_array(values);
    buf.extend_from_slice(&encode_i32(-1));
    buf
}

/// Reads an `int` list up to (not including) its `-1` terminator.
pub fn decode_terminated_list(buf: &[u8]) -> Vec<i32> {
    decode_i32_array(buf)
        .into_iter()
        .take_while(|&v| v != -1)
        .collect()
}

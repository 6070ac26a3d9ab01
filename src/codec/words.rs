/// Splits a double into the two 32-bit words it occupies when passed by
/// value to the engine, low word first.
///
/// The engine is a 32-bit stdcall library: a `double` argument fills two
/// consecutive stack slots, so every call site that passes one goes through
/// this function. The split is a bit reinterpretation and loses nothing.
pub fn split_words(value: f64) -> [u32; 2] {
    let bits = value.to_bits();
    [bits as u32, (bits >> 32) as u32]
}

/// Inverse of [`split_words`].
pub fn join_words(words: [u32; 2]) -> f64 {
    f64::from_bits(u64::from(words[0]) | (u64::from(words[1]) << 32))
}

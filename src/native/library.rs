use std::collections::HashMap;
use std::path::Path;

use libloading::{Library, Symbol};
use strum::IntoEnumIterator;
use tracing::info;

use super::{Arg, Convention, NativeEngine, Procedure};
use crate::codec::{read_terminated, MAX_RETURNED_TEXT};
use crate::error::{BridgeError, Result};

/// Largest argument word count any procedure takes.
pub const MAX_ARITY: usize = 11;

type RawFn = unsafe extern "system" fn();

/// The engine's shared library with every procedure resolved up front.
///
/// The library is a 32-bit stdcall build; argument words are pointer sized,
/// so calls are only meaningful from a 32-bit process.
pub struct LibraryEngine {
    procedures: HashMap<Procedure, RawFn>,
    library: Option<Library>,
}

impl LibraryEngine {
    /// Loads the library and resolves the whole procedure table. A missing
    /// symbol fails the load; no engine is produced.
    pub fn load(path: &Path) -> Result<Self> {
        // SAFETY: loading runs the library's initializers; the engine library is trusted.
        let library = unsafe { Library::new(path) }
            .map_err(|e| BridgeError::LibraryLoad(format!("{}: {e}", path.display())))?;

        let mut procedures = HashMap::new();
        for procedure in Procedure::iter() {
            let symbol = procedure.symbol();
            // SAFETY: only the address is taken here; it is cast to the
            // procedure's real signature at call time by arity.
            let f: Symbol<RawFn> = unsafe { library.get(symbol.as_bytes()) }
                .map_err(|e| BridgeError::LibraryLoad(format!("{symbol}: {e}")))?;
            procedures.insert(procedure, *f);
        }

        info!(path = %path.display(), procedures = procedures.len(), "native library loaded");
        Ok(Self {
            procedures,
            library: Some(library),
        })
    }

    fn call(&mut self, procedure: Procedure, args: &mut [Arg<'_>]) -> usize {
        assert!(self.library.is_some(), "{} called after release", procedure.name());
        debug_assert_eq!(args.len(), procedure.arity(), "{}", procedure.name());

        let f = self.procedures[&procedure];
        let words: Vec<usize> = args.iter_mut().map(to_word).collect();
        // SAFETY: `f` stays valid while `library` is loaded. Every pointer
        // word borrows from `args`, which outlives the call, and buffers are
        // sized by the callers to what the procedure writes.
        unsafe { dispatch(f, &words) }
    }
}

fn to_word(arg: &mut Arg<'_>) -> usize {
    match arg {
        Arg::Int(i) => *i as isize as usize,
        Arg::Word(w) => *w as usize,
        Arg::In(b) => b.as_ptr() as usize,
        Arg::Out(b) => b.as_mut_ptr() as usize,
        Arg::Null => 0,
    }
}

macro_rules! dispatch_arity {
    (@word $i:literal) => { usize };
    ($f:expr, $words:expr, $($n:literal => [$($i:literal),*]),+ $(,)?) => {
        match $words.len() {
            $($n => {
                let g: unsafe extern "system" fn($(dispatch_arity!(@word $i)),*) -> usize =
                    std::mem::transmute($f);
                g($($words[$i]),*)
            })+
            n => unreachable!("no procedure takes {n} argument words"),
        }
    };
}

unsafe fn dispatch(f: RawFn, words: &[usize]) -> usize {
    dispatch_arity!(f, words,
        0 => [],
        1 => [0],
        2 => [0, 1],
        3 => [0, 1, 2],
        4 => [0, 1, 2, 3],
        5 => [0, 1, 2, 3, 4],
        6 => [0, 1, 2, 3, 4, 5],
        7 => [0, 1, 2, 3, 4, 5, 6],
        8 => [0, 1, 2, 3, 4, 5, 6, 7],
        9 => [0, 1, 2, 3, 4, 5, 6, 7, 8],
        10 => [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
        11 => [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
    )
}

impl NativeEngine for LibraryEngine {
    fn invoke(&mut self, procedure: Procedure, args: &mut [Arg<'_>]) -> i32 {
        debug_assert_ne!(procedure.convention(), Convention::Text);
        // The library returns a C int; only the low word is defined.
        self.call(procedure, args) as i32
    }

    fn invoke_text(&mut self, procedure: Procedure, args: &mut [Arg<'_>]) -> String {
        debug_assert_eq!(procedure.convention(), Convention::Text);
        let ptr = self.call(procedure, args) as *const u8;
        // SAFETY: text procedures return null or a NUL-terminated buffer owned
        // by the library; the scan is bounded either way.
        unsafe { read_terminated(ptr, MAX_RETURNED_TEXT) }
    }

    fn release(&mut self) {
        self.procedures.clear();
        if self.library.take().is_some() {
            info!("native library released");
        }
    }
}

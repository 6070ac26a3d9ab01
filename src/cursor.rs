//! # Cursors over engine-held sequences
//!
//! The engine exposes two kinds of sequence:
//!
//! - "get next" procedures walk handles. The caller passes the previous
//!   handle (0 to start) and the engine writes the next one, returning the
//!   sentinel once nothing is left. [`HandleCursor`] wraps these.
//! - Indexed results (picked faults, stepped event steps) are addressed by a
//!   1-based index and simply fail past the end. [`FaultCursor`] and
//!   [`SteppedEventCursor`] wrap these and read a native failure as the end
//!   of the sequence.
//!
//! A cursor never yields the sentinel, and once it reports the end it stays
//! there. Only [`FaultCursor::reset`] rewinds.

use std::fmt;

use tracing::{debug, warn};

use crate::codec;
use crate::data::Handle;
use crate::error::{BridgeError, Result};
use crate::fault::SteppedEvent;
use crate::gate::CallOutcome;

type StepFn = Box<dyn FnMut(Handle) -> Result<Option<Handle>> + Send>;

/// Runs one "get next" call whose out-word carries the previous handle in
/// and the next handle out.
pub(crate) fn step_handle(
    operation: &'static str,
    prev: Handle,
    call: impl FnOnce(&mut [u8]) -> CallOutcome<i32>,
) -> Result<Option<Handle>> {
    let mut word = codec::encode_i32(prev.raw());
    let outcome = call(&mut word);
    Ok(outcome
        .into_result(operation)?
        .map(|_| Handle(codec::decode_i32(&word))))
}

/// Iterates the handles of one "get next" procedure.
///
/// `advance` moves to the next handle and reports whether there was one.
/// The [`Iterator`] impl is the same walk for use with adapters; an error
/// ends it like exhaustion does, and is kept in [`HandleCursor::error`].
pub struct HandleCursor {
    step: StepFn,
    prev: Handle,
    current: Option<Handle>,
    done: bool,
    error: Option<BridgeError>,
}

impl HandleCursor {
    pub(crate) fn new(step: impl FnMut(Handle) -> Result<Option<Handle>> + Send + 'static) -> Self {
        Self {
            step: Box::new(step),
            prev: Handle(0),
            current: None,
            done: false,
            error: None,
        }
    }

    pub fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }
        match (self.step)(self.prev) {
            Ok(Some(handle)) => {
                self.prev = handle;
                self.current = Some(handle);
                true
            }
            Ok(None) => {
                self.finish(None);
                false
            }
            Err(err) => {
                warn!(error = %err, "handle cursor stopped");
                self.finish(Some(err));
                false
            }
        }
    }

    fn finish(&mut self, error: Option<BridgeError>) {
        self.done = true;
        self.current = None;
        self.error = error;
    }

    /// The handle the last successful `advance` moved to.
    pub fn current(&self) -> Option<Handle> {
        self.current
    }

    /// Why iteration stopped, when it was not plain exhaustion.
    pub fn error(&self) -> Option<&BridgeError> {
        self.error.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Drains the cursor, failing if it stopped on an error.
    pub fn collect_handles(mut self) -> Result<Vec<Handle>> {
        let handles: Vec<Handle> = self.by_ref().collect();
        match self.error {
            Some(err) => Err(err),
            None => Ok(handles),
        }
    }
}

impl Iterator for HandleCursor {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        if self.advance() {
            self.current
        } else {
            None
        }
    }
}

impl fmt::Debug for HandleCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleCursor")
            .field("current", &self.current)
            .field("done", &self.done)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Walk over 1-based indices shared by the indexed cursors.
struct Indexed<T> {
    fetch: Box<dyn FnMut(i32) -> Result<T> + Send>,
    index: i32,
    current: Option<T>,
    done: bool,
    error: Option<BridgeError>,
}

impl<T> Indexed<T> {
    fn new(fetch: impl FnMut(i32) -> Result<T> + Send + 'static) -> Self {
        Self {
            fetch: Box::new(fetch),
            index: 0,
            current: None,
            done: false,
            error: None,
        }
    }

    fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }
        let next = self.index + 1;
        match (self.fetch)(next) {
            Ok(value) => {
                self.index = next;
                self.current = Some(value);
                true
            }
            // Past the last index the engine just fails.
            Err(err) if err.is_native() => {
                debug!(index = next, "indexed cursor exhausted");
                self.done = true;
                self.current = None;
                false
            }
            Err(err) => {
                warn!(error = %err, index = next, "indexed cursor stopped");
                self.done = true;
                self.current = None;
                self.error = Some(err);
                false
            }
        }
    }

    fn rewind(&mut self) {
        self.index = 0;
        self.current = None;
        self.done = false;
        self.error = None;
    }
}

/// Picks each fault result of the last run in turn, starting at index 1.
///
/// Every successful `advance` leaves that fault picked in the engine, so the
/// short circuit queries apply to it.
pub struct FaultCursor {
    inner: Indexed<()>,
}

impl FaultCursor {
    pub(crate) fn new(pick: impl FnMut(i32) -> Result<()> + Send + 'static) -> Self {
        Self {
            inner: Indexed::new(pick),
        }
    }

    pub fn advance(&mut self) -> bool {
        self.inner.advance()
    }

    /// Index of the currently picked fault.
    pub fn index(&self) -> Option<i32> {
        self.inner.current.map(|()| self.inner.index)
    }

    pub fn error(&self) -> Option<&BridgeError> {
        self.inner.error.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.inner.done
    }

    /// Starts over from the first fault.
    pub fn reset(&mut self) {
        self.inner.rewind();
    }
}

impl Iterator for FaultCursor {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        if self.advance() {
            self.index()
        } else {
            None
        }
    }
}

/// Reads the steps of the last stepped event run, starting at step 1.
pub struct SteppedEventCursor {
    inner: Indexed<SteppedEvent>,
}

impl SteppedEventCursor {
    pub(crate) fn new(fetch: impl FnMut(i32) -> Result<SteppedEvent> + Send + 'static) -> Self {
        Self {
            inner: Indexed::new(fetch),
        }
    }

    pub fn advance(&mut self) -> bool {
        self.inner.advance()
    }

    pub fn current(&self) -> Option<&SteppedEvent> {
        self.inner.current.as_ref()
    }

    pub fn error(&self) -> Option<&BridgeError> {
        self.inner.error.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.inner.done
    }
}

impl Iterator for SteppedEventCursor {
    type Item = SteppedEvent;

    fn next(&mut self) -> Option<SteppedEvent> {
        if self.advance() {
            self.inner.current.clone()
        } else {
            None
        }
    }
}

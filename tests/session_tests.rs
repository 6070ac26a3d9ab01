//! Session behaviour end to end over the simulated engine.
//!
//! ```bash
//! cargo test --test session_tests
//! ```

#![cfg(feature = "sim")]

mod session;

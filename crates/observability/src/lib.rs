//! Process-wide tracing setup shared by the flockerp binaries.

pub mod logging;

pub use logging::{LogFormat, init, init_with};

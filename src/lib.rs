#![doc = include_str!("../README.md")]

/// Nanosecond time handling and precision tags.
pub mod common {
    pub use fluxline_common::*;
}

/// Line protocol encoding: escaping, schemas, points.
pub mod line {
    pub use fluxline_line::*;
}

#[cfg(feature = "client")]
/// Connection pool, result parsing, and the driver facade.
pub mod client {
    pub use fluxline_client::*;
}

//! Host environment integration

pub mod host;

pub use host::{RawSelection, SelectionSource, StaticSelection};

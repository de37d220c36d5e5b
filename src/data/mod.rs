//! Data layer: the hard-coded game-design tables.
//!
//! Unlike the runtime state these never change and are never persisted;
//! saves refer to entries by index.

pub mod crops;

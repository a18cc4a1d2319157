// Library crate: the editor core, usable headless from integration tests and scripts.
// The binary is a thin driver over `harness` and `command`.

pub mod cloud;
pub mod command;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod polygon;
pub mod predicted;
pub mod state;
pub mod surface;
pub mod table;
pub mod validation;
pub mod viewport;

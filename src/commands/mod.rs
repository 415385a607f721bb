//! Command handlers for the CLI
//!
//! - `produce` sends one record through the REST proxy
//! - `consume` polls a topic until timeout or interrupt

pub mod consume;
pub mod produce;

pub use consume::{run_consume, ConsumeArgs};
pub use produce::{run_produce, ProduceArgs};

//! Sunshine Recorder - start and stop OBS recordings as Moonlight clients
//! connect to Sunshine.

pub mod bridge;
pub mod config;
pub mod console;
pub mod control;
pub mod error;
pub mod monitor;
pub mod recorder;

pub use bridge::Bridge;
pub use error::BridgeError;

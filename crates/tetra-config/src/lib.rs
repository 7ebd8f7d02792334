//! Receiver configuration loading

pub mod receiver_config;
pub mod toml_config;

pub use receiver_config::{ReceiverConfig, StreamKind};

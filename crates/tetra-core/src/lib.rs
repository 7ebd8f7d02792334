//! Core types for the TETRA air-interface receiver
//!
//! This crate provides the bit-level cursor, addressing, timebase and burst
//! taxonomy shared by every stage of the receive pipeline.

/// Git version string, set at compile time
pub const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");
/// Crate version followed by git version string, e.g., "0.3.2-aabbccdd"
pub const RECEIVER_VERSION: &str =
    const_format::formatcp!("{}-{}", env!("CARGO_PKG_VERSION"), GIT_VERSION);

pub mod address;
pub mod bitbuffer;
pub mod debug;
pub mod direction;
pub mod logical_channel;
pub mod pdu_parse_error;
pub mod phy_types;
pub mod tdma_time;

// Re-export commonly used items
pub use address::Address;
pub use bitbuffer::BitBuffer;
pub use direction::Direction;
pub use logical_channel::{LogicalChannel, LogicalChannelDataAndCrc};
pub use pdu_parse_error::PduParseErr;
pub use phy_types::BurstType;
pub use tdma_time::TdmaTime;

pub mod bit_sync;
pub mod iq_sync;

pub use bit_sync::BitSynchronizer;
pub use iq_sync::IqSynchronizer;

pub mod aach;
pub mod bsch;
pub mod builder;
pub mod fields;
pub mod packet;
pub mod slot;

pub use aach::{AccessAssignmentChannel, DownlinkUsage};
pub use bsch::BroadcastSynchronizationChannel;
pub use packet::{
    MacPacketType, UpperMacBroadcastPacket, UpperMacCPlaneSignallingPacket, UpperMacPackets,
    UpperMacUPlaneSignallingPacket, UpperMacUPlaneTrafficPacket,
};
pub use slot::{Slot, Slots, SlotsType};

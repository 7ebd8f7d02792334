use tetra_core::{Address, BitBuffer, Direction, LogicalChannel, PduParseErr};

use crate::umac::fields::{AccessDefine, ChannelAllocationElement, SystemInfo};

/// MAC PDU types of the TMA/TMB/TMD SAPs (Table 21.38 and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacPacketType {
    // downlink c-plane
    MacResource,
    MacFragmentDownlink,
    MacEndDownlink,
    MacDBlck,
    MacBroadcast,

    // uplink c-plane (SCH/HU)
    MacAccess,
    MacEndHu,

    // uplink c-plane
    MacData,
    MacFragmentUplink,
    MacEndUplink,
    MacUBlck,

    // (uplink and downlink) u-plane signalling
    MacUSignal,
}

impl MacPacketType {
    pub fn discriminant(self) -> u8 {
        match self {
            MacPacketType::MacResource => 0,
            MacPacketType::MacFragmentDownlink => 1,
            MacPacketType::MacEndDownlink => 2,
            MacPacketType::MacDBlck => 3,
            MacPacketType::MacBroadcast => 4,
            MacPacketType::MacAccess => 5,
            MacPacketType::MacEndHu => 6,
            MacPacketType::MacData => 7,
            MacPacketType::MacFragmentUplink => 8,
            MacPacketType::MacEndUplink => 9,
            MacPacketType::MacUBlck => 10,
            MacPacketType::MacUSignal => 11,
        }
    }
}

impl core::fmt::Display for MacPacketType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Reconstruct the TM-SDU bit count from a length indication field.
///
/// Y1/Z1 apply to PDUs sent in a subslot (MAC-ACCESS, MAC-END-HU), Y2/Z2 to
/// full-slot PDUs. The values are those of π/4-DQPSK ("Table 21.98"); other
/// modulations would swap this table out. Constants are in bits, not octets.
pub struct LengthIndication;

impl LengthIndication {
    const Y1: usize = 8;
    const Z1: usize = 8;
    const Y2: usize = 8;
    const Z2: usize = 8;

    pub fn from_mac_access(li: u8) -> usize {
        if li < 0b01111 {
            li as usize * Self::Y1
        } else {
            14 * Self::Y1 + (li as usize - 14) * Self::Z1
        }
    }

    pub fn from_mac_end_hu(li: u8) -> usize {
        li as usize * Self::Z1
    }

    pub fn from_mac_data(li: u8) -> usize {
        if li < 0b010011 {
            li as usize * Self::Y2
        } else {
            18 * Self::Y2 + (li as usize - 18) * Self::Z2
        }
    }

    pub fn from_mac_end_uplink(li: u8) -> usize {
        if li < 0b000111 {
            li as usize * Self::Y2
        } else {
            6 * Self::Y2 + (li as usize - 6) * Self::Z2
        }
    }

    pub fn from_mac_resource(li: u8) -> usize {
        Self::from_mac_data(li)
    }

    pub fn from_mac_end_downlink(li: u8) -> usize {
        Self::from_mac_data(li)
    }
}

/// A C-plane signalling PDU of the upper MAC.
#[derive(Debug, Clone)]
pub struct UpperMacCPlaneSignallingPacket {
    /// the logical channel this packet was received on
    pub logical_channel: LogicalChannel,
    /// transfer direction, derived from the burst type at parse time
    pub direction: Direction,
    /// the MAC PDU type
    pub ptype: MacPacketType,

    pub encrypted: bool,
    pub address: Address,
    pub fragmentation: bool,
    pub fragmentation_on_stealing_channel: bool,
    pub reservation_requirement: Option<u8>,

    /// the TM-SDU handed to the LLC
    pub tm_sdu: Option<BitBuffer>,

    // uplink only
    pub encryption_mode: Option<u8>,

    // downlink only
    pub immediate_napping_permission_flag: Option<bool>,
    pub basic_slot_granting_element: Option<u8>,
    pub position_of_grant: Option<u8>,
    pub channel_allocation_element: Option<ChannelAllocationElement>,
    pub random_access_flag: Option<bool>,
    pub power_control_element: Option<u8>,
}

impl UpperMacCPlaneSignallingPacket {
    pub fn new(
        logical_channel: LogicalChannel,
        direction: Direction,
        ptype: MacPacketType,
    ) -> Self {
        UpperMacCPlaneSignallingPacket {
            logical_channel,
            direction,
            ptype,
            encrypted: false,
            address: Address::default(),
            fragmentation: false,
            fragmentation_on_stealing_channel: false,
            reservation_requirement: None,
            tm_sdu: None,
            encryption_mode: None,
            immediate_napping_permission_flag: None,
            basic_slot_granting_element: None,
            position_of_grant: None,
            channel_allocation_element: None,
            random_access_flag: None,
            power_control_element: None,
        }
    }

    /// Start or continuation of a downlink fragment chain.
    pub fn is_downlink_fragment(&self) -> bool {
        (self.ptype == MacPacketType::MacResource && self.fragmentation)
            || self.ptype == MacPacketType::MacFragmentDownlink
    }

    /// Start or continuation of an uplink fragment chain.
    pub fn is_uplink_fragment(&self) -> bool {
        ((self.ptype == MacPacketType::MacAccess || self.ptype == MacPacketType::MacData)
            && self.fragmentation)
            || self.ptype == MacPacketType::MacFragmentUplink
    }

    /// End marker of a fragment chain in either direction.
    pub fn is_fragment_end(&self) -> bool {
        matches!(
            self.ptype,
            MacPacketType::MacEndDownlink | MacPacketType::MacEndHu | MacPacketType::MacEndUplink
        )
    }

    /// The null PDU marks the end of useful data in a MAC block.
    pub fn is_null_pdu(&self) -> bool {
        self.ptype == MacPacketType::MacResource
            && self.address.is_empty()
            && self.tm_sdu.is_none()
    }
}

/// MAC-U-SIGNAL: U-plane signalling on the stealing channel.
#[derive(Debug, Clone)]
pub struct UpperMacUPlaneSignallingPacket {
    pub logical_channel: LogicalChannel,
    pub ptype: MacPacketType,
    /// set when the PDU declares the second half slot stolen as well
    pub second_slot_stolen: bool,
    pub tm_sdu: BitBuffer,
}

/// Raw traffic of one slot or subslot.
#[derive(Debug, Clone)]
pub struct UpperMacUPlaneTrafficPacket {
    pub logical_channel: LogicalChannel,
    pub data: BitBuffer,
}

/// SYSINFO / ACCESS-DEFINE broadcast of the TMB SAP.
#[derive(Debug, Clone)]
pub struct UpperMacBroadcastPacket {
    pub logical_channel: LogicalChannel,
    pub ptype: MacPacketType,
    pub sysinfo: Option<SystemInfo>,
    pub access_define: Option<AccessDefine>,
}

/// Everything the upper MAC extracted from one slot (or pair of subslots).
#[derive(Debug, Clone, Default)]
pub struct UpperMacPackets {
    pub c_plane_signalling_packets: Vec<UpperMacCPlaneSignallingPacket>,
    pub u_plane_signalling_packets: Vec<UpperMacUPlaneSignallingPacket>,
    pub u_plane_traffic_packet: Option<UpperMacUPlaneTrafficPacket>,
    pub broadcast_packet: Option<UpperMacBroadcastPacket>,
}

impl UpperMacPackets {
    /// Merge packets of a second subslot into this set. Traffic and
    /// broadcast must stay unique across a merge.
    pub fn merge(&mut self, other: UpperMacPackets) -> Result<(), PduParseErr> {
        self.c_plane_signalling_packets
            .extend(other.c_plane_signalling_packets);
        self.u_plane_signalling_packets
            .extend(other.u_plane_signalling_packets);

        if self.u_plane_traffic_packet.is_some() && other.u_plane_traffic_packet.is_some() {
            return Err(PduParseErr::Unexpected { field: "duplicate traffic packet in merge" });
        }
        if other.u_plane_traffic_packet.is_some() {
            self.u_plane_traffic_packet = other.u_plane_traffic_packet;
        }

        if self.broadcast_packet.is_some() && other.broadcast_packet.is_some() {
            return Err(PduParseErr::Unexpected { field: "duplicate broadcast packet in merge" });
        }
        if other.broadcast_packet.is_some() {
            self.broadcast_packet = other.broadcast_packet;
        }

        Ok(())
    }
}

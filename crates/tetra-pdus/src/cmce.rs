//! Circuit Mode Control Entity: PDU type dispatch and SDS-DATA (Clause 14).

use std::collections::BTreeMap;

use tetra_core::{Address, BitBuffer, Direction, PduParseErr};

use crate::mle::MobileLinkEntityPacket;
use crate::type234::{ElementIdentifier, Type234Parser, Type34Element};

/// Downlink CMCE PDU types (Table 14.5.x, 5 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmceDownlinkPacketType {
    DAlert,
    DCallProceeding,
    DConnect,
    DConnectAcknowledge,
    DDisconnect,
    DInfo,
    DRelease,
    DSetup,
    DStatus,
    DTxCeased,
    DTxContinue,
    DTxGranted,
    DTxWait,
    DTxInterrupt,
    DCallRestore,
    DSdsData,
    DFacility,
    DReserved(u8),
    CmceFunctionNotSupported,
}

impl CmceDownlinkPacketType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => CmceDownlinkPacketType::DAlert,
            1 => CmceDownlinkPacketType::DCallProceeding,
            2 => CmceDownlinkPacketType::DConnect,
            3 => CmceDownlinkPacketType::DConnectAcknowledge,
            4 => CmceDownlinkPacketType::DDisconnect,
            5 => CmceDownlinkPacketType::DInfo,
            6 => CmceDownlinkPacketType::DRelease,
            7 => CmceDownlinkPacketType::DSetup,
            8 => CmceDownlinkPacketType::DStatus,
            9 => CmceDownlinkPacketType::DTxCeased,
            10 => CmceDownlinkPacketType::DTxContinue,
            11 => CmceDownlinkPacketType::DTxGranted,
            12 => CmceDownlinkPacketType::DTxWait,
            13 => CmceDownlinkPacketType::DTxInterrupt,
            14 => CmceDownlinkPacketType::DCallRestore,
            15 => CmceDownlinkPacketType::DSdsData,
            16 => CmceDownlinkPacketType::DFacility,
            31 => CmceDownlinkPacketType::CmceFunctionNotSupported,
            other => CmceDownlinkPacketType::DReserved(other),
        }
    }

    pub fn discriminant(self) -> u8 {
        match self {
            CmceDownlinkPacketType::DAlert => 0,
            CmceDownlinkPacketType::DCallProceeding => 1,
            CmceDownlinkPacketType::DConnect => 2,
            CmceDownlinkPacketType::DConnectAcknowledge => 3,
            CmceDownlinkPacketType::DDisconnect => 4,
            CmceDownlinkPacketType::DInfo => 5,
            CmceDownlinkPacketType::DRelease => 6,
            CmceDownlinkPacketType::DSetup => 7,
            CmceDownlinkPacketType::DStatus => 8,
            CmceDownlinkPacketType::DTxCeased => 9,
            CmceDownlinkPacketType::DTxContinue => 10,
            CmceDownlinkPacketType::DTxGranted => 11,
            CmceDownlinkPacketType::DTxWait => 12,
            CmceDownlinkPacketType::DTxInterrupt => 13,
            CmceDownlinkPacketType::DCallRestore => 14,
            CmceDownlinkPacketType::DSdsData => 15,
            CmceDownlinkPacketType::DFacility => 16,
            CmceDownlinkPacketType::DReserved(raw) => raw,
            CmceDownlinkPacketType::CmceFunctionNotSupported => 31,
        }
    }
}

/// Uplink CMCE PDU types (5 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmceUplinkPacketType {
    UAlert,
    UConnect,
    UDisconnect,
    UInfo,
    URelease,
    USetup,
    UStatus,
    UTxCeased,
    UTxDemand,
    UCallRestore,
    USdsData,
    UFacility,
    UReserved(u8),
    CmceFunctionNotSupported,
}

impl CmceUplinkPacketType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => CmceUplinkPacketType::UAlert,
            2 => CmceUplinkPacketType::UConnect,
            4 => CmceUplinkPacketType::UDisconnect,
            5 => CmceUplinkPacketType::UInfo,
            6 => CmceUplinkPacketType::URelease,
            7 => CmceUplinkPacketType::USetup,
            8 => CmceUplinkPacketType::UStatus,
            9 => CmceUplinkPacketType::UTxCeased,
            10 => CmceUplinkPacketType::UTxDemand,
            14 => CmceUplinkPacketType::UCallRestore,
            15 => CmceUplinkPacketType::USdsData,
            16 => CmceUplinkPacketType::UFacility,
            31 => CmceUplinkPacketType::CmceFunctionNotSupported,
            other => CmceUplinkPacketType::UReserved(other),
        }
    }

    pub fn discriminant(self) -> u8 {
        match self {
            CmceUplinkPacketType::UAlert => 0,
            CmceUplinkPacketType::UConnect => 2,
            CmceUplinkPacketType::UDisconnect => 4,
            CmceUplinkPacketType::UInfo => 5,
            CmceUplinkPacketType::URelease => 6,
            CmceUplinkPacketType::USetup => 7,
            CmceUplinkPacketType::UStatus => 8,
            CmceUplinkPacketType::UTxCeased => 9,
            CmceUplinkPacketType::UTxDemand => 10,
            CmceUplinkPacketType::UCallRestore => 14,
            CmceUplinkPacketType::USdsData => 15,
            CmceUplinkPacketType::UFacility => 16,
            CmceUplinkPacketType::UReserved(raw) => raw,
            CmceUplinkPacketType::CmceFunctionNotSupported => 31,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmcePacketType {
    Downlink(CmceDownlinkPacketType),
    Uplink(CmceUplinkPacketType),
}

impl CmcePacketType {
    pub fn discriminant(self) -> u8 {
        match self {
            CmcePacketType::Downlink(t) => t.discriminant(),
            CmcePacketType::Uplink(t) => t.discriminant(),
        }
    }

    pub fn is_sds_data(self) -> bool {
        matches!(
            self,
            CmcePacketType::Downlink(CmceDownlinkPacketType::DSdsData)
                | CmcePacketType::Uplink(CmceUplinkPacketType::USdsData)
        )
    }
}

/// CMCE Type-3 element identifiers (Clause 14.8.48).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CmceType3ElemId {
    Dtmf,
    ExternalSubscriberNumber,
    Facility,
    PollResponseAddresses,
    TemporaryAddress,
    DmMsAddress,
    Proprietary,
}

impl ElementIdentifier for CmceType3ElemId {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(CmceType3ElemId::Dtmf),
            2 => Some(CmceType3ElemId::ExternalSubscriberNumber),
            3 => Some(CmceType3ElemId::Facility),
            4 => Some(CmceType3ElemId::PollResponseAddresses),
            5 => Some(CmceType3ElemId::TemporaryAddress),
            6 => Some(CmceType3ElemId::DmMsAddress),
            15 => Some(CmceType3ElemId::Proprietary),
            _ => None,
        }
    }

    fn raw(self) -> u8 {
        match self {
            CmceType3ElemId::Dtmf => 1,
            CmceType3ElemId::ExternalSubscriberNumber => 2,
            CmceType3ElemId::Facility => 3,
            CmceType3ElemId::PollResponseAddresses => 4,
            CmceType3ElemId::TemporaryAddress => 5,
            CmceType3ElemId::DmMsAddress => 6,
            CmceType3ElemId::Proprietary => 15,
        }
    }
}

const SDS_TYPE3_ELEMENTS: &[CmceType3ElemId] =
    &[CmceType3ElemId::ExternalSubscriberNumber, CmceType3ElemId::DmMsAddress];
const SDS_TYPE4_ELEMENTS: &[CmceType3ElemId] = &[];

/// User data of a D-SDS-DATA / U-SDS-DATA PDU (Clauses 14.7.1.10/14.7.2.7).
#[derive(Debug, Clone)]
pub struct SdsData {
    /// area selection, uplink only
    pub area_selection: Option<u8>,
    /// calling party (downlink) or called party (uplink)
    pub address: Address,
    /// the short data payload, length per the short data type identifier
    pub data: BitBuffer,
    /// trailing optional elements, kept unparsed
    pub optional_elements: BTreeMap<CmceType3ElemId, Type34Element>,
}

impl SdsData {
    pub fn from_d_sds_data(data: &mut BitBuffer) -> Result<Self, PduParseErr> {
        Self::parse(data, false)
    }

    pub fn from_u_sds_data(data: &mut BitBuffer) -> Result<Self, PduParseErr> {
        Self::parse(data, true)
    }

    fn parse(data: &mut BitBuffer, uplink: bool) -> Result<Self, PduParseErr> {
        let mut sds = SdsData {
            area_selection: None,
            address: Address::default(),
            data: BitBuffer::new(0),
            optional_elements: BTreeMap::new(),
        };

        if uplink {
            sds.area_selection = Some(data.read_field(4, "area_selection")? as u8);
        }

        let calling_party_type = data.read_field(2, "calling_party_type_identifier")?;
        if uplink && calling_party_type == 0 {
            sds.address.sna = Some(data.read_field(8, "sna")? as u8);
        }
        if calling_party_type == 1 || calling_party_type == 2 {
            sds.address.ssi = Some(data.read_field(24, "ssi")? as u32);
        }
        if calling_party_type == 2 {
            sds.address.country_code = Some(data.read_field(10, "country_code")? as u16);
            sds.address.network_code = Some(data.read_field(14, "network_code")? as u16);
        }

        let length_bits = match data.read_field(2, "short_data_type_identifier")? {
            0b00 => 16,
            0b01 => 32,
            0b10 => 64,
            _ => data.read_field(11, "length_identifier")? as usize,
        };
        sds.data = data.take_vector(length_bits)?;

        let parser = Type234Parser::new(data, SDS_TYPE3_ELEMENTS, SDS_TYPE4_ELEMENTS)?;
        sds.optional_elements = parser.parse_type34(data)?;

        Ok(sds)
    }
}

/// The packet parsed in the CMCE layer.
#[derive(Debug, Clone)]
pub struct CircuitModeControlEntityPacket {
    pub mle: MobileLinkEntityPacket,
    pub packet_type: CmcePacketType,
    pub sds_data: Option<SdsData>,
}

impl CircuitModeControlEntityPacket {
    pub fn parse(mle: MobileLinkEntityPacket) -> Result<Self, PduParseErr> {
        let mut data = mle.sdu.clone();
        data.seek(0);

        let raw = data.read_field(5, "cmce_pdu_type")? as u8;
        let packet_type = match mle.llc.mac.direction {
            Direction::Dl => CmcePacketType::Downlink(CmceDownlinkPacketType::from_raw(raw)),
            Direction::Ul => CmcePacketType::Uplink(CmceUplinkPacketType::from_raw(raw)),
        };

        let sds_data = match packet_type {
            CmcePacketType::Downlink(CmceDownlinkPacketType::DSdsData) => {
                Some(SdsData::from_d_sds_data(&mut data)?)
            }
            CmcePacketType::Uplink(CmceUplinkPacketType::USdsData) => {
                Some(SdsData::from_u_sds_data(&mut data)?)
            }
            _ => None,
        };

        Ok(CircuitModeControlEntityPacket { mle, packet_type, sds_data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetra_core::LogicalChannel;

    use crate::llc::LogicalLinkControlPacket;
    use crate::umac::packet::{MacPacketType, UpperMacCPlaneSignallingPacket};

    fn mle_with_sdu(direction: Direction, sdu: BitBuffer) -> MobileLinkEntityPacket {
        let mut mac = UpperMacCPlaneSignallingPacket::new(
            LogicalChannel::SchF,
            direction,
            MacPacketType::MacResource,
        );
        mac.tm_sdu = Some(BitBuffer::new(0));
        MobileLinkEntityPacket {
            llc: LogicalLinkControlPacket {
                mac,
                basic_link_information: None,
                tl_sdu: BitBuffer::new(0),
            },
            mle_protocol: crate::mle::MleProtocol::Cmce,
            sdu,
            mle_service_pdu_type: None,
            mle_extended_pdu_type: None,
        }
    }

    #[test]
    fn d_sds_data_with_ssi_and_16bit_payload() {
        let mut sdu = BitBuffer::new_autoexpand(64);
        sdu.write_bits(15, 5); // D-SDS-DATA
        sdu.write_bits(1, 2); // calling party: SSI
        sdu.write_bits(0x00C0FE, 24);
        sdu.write_bits(0b00, 2); // 16-bit payload
        sdu.write_bits(0x0A11, 16);
        sdu.write_bits(0, 1); // o-bit: no optional elements
        sdu.seek(0);

        let cmce =
            CircuitModeControlEntityPacket::parse(mle_with_sdu(Direction::Dl, sdu)).unwrap();
        assert!(cmce.packet_type.is_sds_data());
        let sds = cmce.sds_data.unwrap();
        assert_eq!(sds.address.ssi, Some(0x00C0FE));
        assert_eq!(sds.area_selection, None);
        assert_eq!(sds.data.to_bitstr(), "0000101000010001");
    }

    #[test]
    fn u_sds_data_with_area_selection_and_variable_length() {
        let mut sdu = BitBuffer::new_autoexpand(96);
        sdu.write_bits(15, 5); // U-SDS-DATA
        sdu.write_bits(0b0011, 4); // area selection
        sdu.write_bits(0, 2); // calling party: SNA
        sdu.write_bits(0x42, 8);
        sdu.write_bits(0b11, 2); // explicit length
        sdu.write_bits(12, 11);
        sdu.write_bits(0xABC, 12);
        sdu.write_bits(0, 1); // o-bit
        sdu.seek(0);

        let cmce =
            CircuitModeControlEntityPacket::parse(mle_with_sdu(Direction::Ul, sdu)).unwrap();
        let sds = cmce.sds_data.unwrap();
        assert_eq!(sds.area_selection, Some(0b0011));
        assert_eq!(sds.address.sna, Some(0x42));
        assert_eq!(sds.data.bits_left(), 12);
    }

    #[test]
    fn non_sds_types_stay_shallow() {
        let mut sdu = BitBuffer::new_autoexpand(16);
        sdu.write_bits(7, 5); // D-SETUP
        sdu.write_bits(0b101, 3);
        sdu.seek(0);

        let cmce =
            CircuitModeControlEntityPacket::parse(mle_with_sdu(Direction::Dl, sdu)).unwrap();
        assert_eq!(
            cmce.packet_type,
            CmcePacketType::Downlink(CmceDownlinkPacketType::DSetup)
        );
        assert!(cmce.sds_data.is_none());
    }
}

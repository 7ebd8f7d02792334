//! Mobile Management: PDU type dispatch and location update parsing
//! (Clause 16).

use std::collections::BTreeMap;

use tetra_core::{Address, BitBuffer, Direction, PduParseErr};

use crate::mle::MobileLinkEntityPacket;
use crate::type234::{ElementIdentifier, Type234Parser, Type34Element};

/// Downlink MM PDU types (4 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmDownlinkPacketType {
    DOtar,
    DAuthentication,
    DCkChangeDemand,
    DDisable,
    DEnable,
    DLocationUpdateAccept,
    DLocationUpdateCommand,
    DLocationUpdateReject,
    DReserved8,
    DLocationUpdateProceeding,
    DAttachDetachGroupIdentity,
    DAttachDetachGroupIdentityAck,
    DMmStatus,
    DReserved13,
    DReserved14,
    DMmPduFunctionNotSupported,
}

impl MmDownlinkPacketType {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0xf {
            0 => MmDownlinkPacketType::DOtar,
            1 => MmDownlinkPacketType::DAuthentication,
            2 => MmDownlinkPacketType::DCkChangeDemand,
            3 => MmDownlinkPacketType::DDisable,
            4 => MmDownlinkPacketType::DEnable,
            5 => MmDownlinkPacketType::DLocationUpdateAccept,
            6 => MmDownlinkPacketType::DLocationUpdateCommand,
            7 => MmDownlinkPacketType::DLocationUpdateReject,
            8 => MmDownlinkPacketType::DReserved8,
            9 => MmDownlinkPacketType::DLocationUpdateProceeding,
            10 => MmDownlinkPacketType::DAttachDetachGroupIdentity,
            11 => MmDownlinkPacketType::DAttachDetachGroupIdentityAck,
            12 => MmDownlinkPacketType::DMmStatus,
            13 => MmDownlinkPacketType::DReserved13,
            14 => MmDownlinkPacketType::DReserved14,
            _ => MmDownlinkPacketType::DMmPduFunctionNotSupported,
        }
    }

    pub fn discriminant(self) -> u8 {
        self as u8
    }
}

/// Uplink MM PDU types (4 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmUplinkPacketType {
    UAuthentication,
    UItsiDetach,
    ULocationUpdateDemand,
    UMmStatus,
    UCkChangeResult,
    UOtar,
    UInformationProvide,
    UAttachDetachGroupIdentity,
    UAttachDetachGroupIdentityAck,
    UTeiProvide,
    UReserved10,
    UDisableStatus,
    UReserved12,
    UReserved13,
    UReserved14,
    UMmPduFunctionNotSupported,
}

impl MmUplinkPacketType {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0xf {
            0 => MmUplinkPacketType::UAuthentication,
            1 => MmUplinkPacketType::UItsiDetach,
            2 => MmUplinkPacketType::ULocationUpdateDemand,
            3 => MmUplinkPacketType::UMmStatus,
            4 => MmUplinkPacketType::UCkChangeResult,
            5 => MmUplinkPacketType::UOtar,
            6 => MmUplinkPacketType::UInformationProvide,
            7 => MmUplinkPacketType::UAttachDetachGroupIdentity,
            8 => MmUplinkPacketType::UAttachDetachGroupIdentityAck,
            9 => MmUplinkPacketType::UTeiProvide,
            10 => MmUplinkPacketType::UReserved10,
            11 => MmUplinkPacketType::UDisableStatus,
            12 => MmUplinkPacketType::UReserved12,
            13 => MmUplinkPacketType::UReserved13,
            14 => MmUplinkPacketType::UReserved14,
            _ => MmUplinkPacketType::UMmPduFunctionNotSupported,
        }
    }

    pub fn discriminant(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmPacketType {
    Downlink(MmDownlinkPacketType),
    Uplink(MmUplinkPacketType),
}

impl MmPacketType {
    pub fn discriminant(self) -> u8 {
        match self {
            MmPacketType::Downlink(t) => t.discriminant(),
            MmPacketType::Uplink(t) => t.discriminant(),
        }
    }
}

/// Location update accept type (Clause 16.10.35a, 3 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationUpdateAcceptType {
    RoamingLocationUpdating,
    TemporaryRegistration,
    PeriodicLocationUpdating,
    ItsiAttach,
    ServiceRestorationRoamingLocationUpdating,
    MigratingOrServiceRestorationMigratingLocationUpdating,
    DemandLocationUpdating,
    DisabledMsUpdating,
}

impl LocationUpdateAcceptType {
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x7 {
            0 => LocationUpdateAcceptType::RoamingLocationUpdating,
            1 => LocationUpdateAcceptType::TemporaryRegistration,
            2 => LocationUpdateAcceptType::PeriodicLocationUpdating,
            3 => LocationUpdateAcceptType::ItsiAttach,
            4 => LocationUpdateAcceptType::ServiceRestorationRoamingLocationUpdating,
            5 => LocationUpdateAcceptType::MigratingOrServiceRestorationMigratingLocationUpdating,
            6 => LocationUpdateAcceptType::DemandLocationUpdating,
            _ => LocationUpdateAcceptType::DisabledMsUpdating,
        }
    }

    pub fn discriminant(self) -> u8 {
        self as u8
    }
}

/// Downlink MM Type-3/4 element identifiers (Clause 16.10.51).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MmType34ElemIdDl {
    DefaultGroupAttachLifetime,
    NewRegisteredArea,
    SecurityDownlink,
    GroupReportResponse,
    GroupIdentityLocationAccept,
    DmMsAddress,
    GroupIdentityDownlink,
    AuthenticationDownlink,
    GroupIdentitySecurityRelatedInformation,
    CellTypeControl,
    Proprietary,
}

impl ElementIdentifier for MmType34ElemIdDl {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(MmType34ElemIdDl::DefaultGroupAttachLifetime),
            2 => Some(MmType34ElemIdDl::NewRegisteredArea),
            3 => Some(MmType34ElemIdDl::SecurityDownlink),
            4 => Some(MmType34ElemIdDl::GroupReportResponse),
            5 => Some(MmType34ElemIdDl::GroupIdentityLocationAccept),
            6 => Some(MmType34ElemIdDl::DmMsAddress),
            7 => Some(MmType34ElemIdDl::GroupIdentityDownlink),
            10 => Some(MmType34ElemIdDl::AuthenticationDownlink),
            12 => Some(MmType34ElemIdDl::GroupIdentitySecurityRelatedInformation),
            13 => Some(MmType34ElemIdDl::CellTypeControl),
            15 => Some(MmType34ElemIdDl::Proprietary),
            _ => None,
        }
    }

    fn raw(self) -> u8 {
        match self {
            MmType34ElemIdDl::DefaultGroupAttachLifetime => 1,
            MmType34ElemIdDl::NewRegisteredArea => 2,
            MmType34ElemIdDl::SecurityDownlink => 3,
            MmType34ElemIdDl::GroupReportResponse => 4,
            MmType34ElemIdDl::GroupIdentityLocationAccept => 5,
            MmType34ElemIdDl::DmMsAddress => 6,
            MmType34ElemIdDl::GroupIdentityDownlink => 7,
            MmType34ElemIdDl::AuthenticationDownlink => 10,
            MmType34ElemIdDl::GroupIdentitySecurityRelatedInformation => 12,
            MmType34ElemIdDl::CellTypeControl => 13,
            MmType34ElemIdDl::Proprietary => 15,
        }
    }
}

const LOCATION_UPDATE_ACCEPT_TYPE3: &[MmType34ElemIdDl] = &[
    MmType34ElemIdDl::SecurityDownlink,
    MmType34ElemIdDl::GroupIdentityLocationAccept,
    MmType34ElemIdDl::DefaultGroupAttachLifetime,
    MmType34ElemIdDl::AuthenticationDownlink,
    MmType34ElemIdDl::CellTypeControl,
    MmType34ElemIdDl::Proprietary,
];
const LOCATION_UPDATE_ACCEPT_TYPE4: &[MmType34ElemIdDl] = &[
    MmType34ElemIdDl::NewRegisteredArea,
    MmType34ElemIdDl::GroupIdentitySecurityRelatedInformation,
];

/// D-LOCATION UPDATE ACCEPT (Clause 16.9.2.7).
#[derive(Debug, Clone)]
pub struct DLocationUpdateAccept {
    pub location_update_accept_type: LocationUpdateAcceptType,
    /// SSI and/or MNI of the MS, merged from the optional Type-2 elements
    pub address: Address,
    pub subscriber_class: Option<u16>,
    pub energy_saving_information: Option<u16>,
    pub scch_information: Option<u8>,
    pub distribution_on_18th_frame: Option<u8>,
    pub optional_elements: BTreeMap<MmType34ElemIdDl, Type34Element>,
}

impl DLocationUpdateAccept {
    pub fn from_buf(data: &mut BitBuffer) -> Result<Self, PduParseErr> {
        let location_update_accept_type =
            LocationUpdateAcceptType::from_raw(data.read_field(3, "location_update_accept_type")? as u8);

        let parser = Type234Parser::new(
            data,
            LOCATION_UPDATE_ACCEPT_TYPE3,
            LOCATION_UPDATE_ACCEPT_TYPE4,
        )?;

        let mut address = Address::default();
        let ssi = parser.parse_type2(data, |d| d.read_field(24, "ssi"))?;
        if let Some(ssi) = ssi {
            address.ssi = Some(ssi as u32);
        }
        let mni = parser.parse_type2(data, |d| {
            let country_code = d.read_field(10, "country_code")? as u16;
            let network_code = d.read_field(14, "network_code")? as u16;
            Ok((country_code, network_code))
        })?;
        if let Some((country_code, network_code)) = mni {
            address.country_code = Some(country_code);
            address.network_code = Some(network_code);
        }

        let subscriber_class =
            parser.parse_type2(data, |d| d.read_field(16, "subscriber_class"))?;
        let energy_saving_information =
            parser.parse_type2(data, |d| d.read_field(14, "energy_saving_information"))?;
        let scch = parser.parse_type2(data, |d| {
            let scch_information = d.read_field(4, "scch_information")? as u8;
            let distribution = d.read_field(2, "distribution_on_18th_frame")? as u8;
            Ok((scch_information, distribution))
        })?;

        let optional_elements = parser.parse_type34(data)?;

        Ok(DLocationUpdateAccept {
            location_update_accept_type,
            address,
            subscriber_class: subscriber_class.map(|v| v as u16),
            energy_saving_information: energy_saving_information.map(|v| v as u16),
            scch_information: scch.map(|(s, _)| s),
            distribution_on_18th_frame: scch.map(|(_, d)| d),
            optional_elements,
        })
    }
}

/// D-ATTACH/DETACH GROUP IDENTITY ACK (Clause 16.9.2.2).
#[derive(Debug, Clone)]
pub struct DAttachDetachGroupIdentityAck {
    pub group_identity_accept_reject: u8,
    pub optional_elements: BTreeMap<MmType34ElemIdDl, Type34Element>,
}

const GROUP_IDENTITY_ACK_TYPE3: &[MmType34ElemIdDl] = &[MmType34ElemIdDl::Proprietary];
const GROUP_IDENTITY_ACK_TYPE4: &[MmType34ElemIdDl] = &[
    MmType34ElemIdDl::GroupIdentityDownlink,
    MmType34ElemIdDl::GroupIdentitySecurityRelatedInformation,
];

impl DAttachDetachGroupIdentityAck {
    pub fn from_buf(data: &mut BitBuffer) -> Result<Self, PduParseErr> {
        let group_identity_accept_reject = data.read_field(1, "group_identity_accept_reject")? as u8;
        let _reserved = data.read_field(1, "reserved")?;

        let parser = Type234Parser::new(data, GROUP_IDENTITY_ACK_TYPE3, GROUP_IDENTITY_ACK_TYPE4)?;
        let optional_elements = parser.parse_type34(data)?;

        Ok(DAttachDetachGroupIdentityAck { group_identity_accept_reject, optional_elements })
    }
}

/// The packet parsed in the MM layer.
#[derive(Debug, Clone)]
pub struct MobileManagementPacket {
    pub mle: MobileLinkEntityPacket,
    pub packet_type: MmPacketType,
    pub location_update_accept: Option<DLocationUpdateAccept>,
    pub attach_detach_group_identity_ack: Option<DAttachDetachGroupIdentityAck>,
}

impl MobileManagementPacket {
    pub fn parse(mle: MobileLinkEntityPacket) -> Result<Self, PduParseErr> {
        let mut data = mle.sdu.clone();
        data.seek(0);

        let raw = data.read_field(4, "mm_pdu_type")? as u8;
        let packet_type = match mle.llc.mac.direction {
            Direction::Dl => MmPacketType::Downlink(MmDownlinkPacketType::from_raw(raw)),
            Direction::Ul => MmPacketType::Uplink(MmUplinkPacketType::from_raw(raw)),
        };

        let mut location_update_accept = None;
        let mut attach_detach_group_identity_ack = None;
        match packet_type {
            MmPacketType::Downlink(MmDownlinkPacketType::DLocationUpdateAccept) => {
                location_update_accept = Some(DLocationUpdateAccept::from_buf(&mut data)?);
            }
            MmPacketType::Downlink(MmDownlinkPacketType::DAttachDetachGroupIdentityAck) => {
                attach_detach_group_identity_ack =
                    Some(DAttachDetachGroupIdentityAck::from_buf(&mut data)?);
            }
            // all other MM types stay opaque
            _ => {}
        }

        Ok(MobileManagementPacket {
            mle,
            packet_type,
            location_update_accept,
            attach_detach_group_identity_ack,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetra_core::LogicalChannel;

    use crate::llc::LogicalLinkControlPacket;
    use crate::mle::MleProtocol;
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
            mle_protocol: MleProtocol::Mm,
            sdu,
            mle_service_pdu_type: None,
            mle_extended_pdu_type: None,
        }
    }

    #[test]
    fn location_update_accept_with_ssi() {
        let mut sdu = BitBuffer::new_autoexpand(96);
        sdu.write_bits(5, 4); // D-LOCATION UPDATE ACCEPT
        sdu.write_bits(3, 3); // ITSI attach
        sdu.write_bits(1, 1); // o-bit
        sdu.write_bits(1, 1); // p-bit: ssi present
        sdu.write_bits(0x123456, 24);
        sdu.write_bits(0, 1); // no mni
        sdu.write_bits(0, 1); // no subscriber class
        sdu.write_bits(0, 1); // no energy saving information
        sdu.write_bits(0, 1); // no scch information
        sdu.write_bits(0, 1); // trailing m-bit
        sdu.seek(0);

        let mm = MobileManagementPacket::parse(mle_with_sdu(Direction::Dl, sdu)).unwrap();
        assert_eq!(
            mm.packet_type,
            MmPacketType::Downlink(MmDownlinkPacketType::DLocationUpdateAccept)
        );
        let accept = mm.location_update_accept.unwrap();
        assert_eq!(accept.location_update_accept_type, LocationUpdateAcceptType::ItsiAttach);
        assert_eq!(accept.address.ssi, Some(0x123456));
        assert_eq!(accept.subscriber_class, None);
        assert!(accept.optional_elements.is_empty());
    }

    #[test]
    fn location_update_accept_with_type3_element() {
        let mut sdu = BitBuffer::new_autoexpand(96);
        sdu.write_bits(5, 4);
        sdu.write_bits(0, 3);
        sdu.write_bits(1, 1); // o-bit
        sdu.write_bits(0, 1); // no ssi
        sdu.write_bits(0, 1); // no mni
        sdu.write_bits(0, 1); // no subscriber class
        sdu.write_bits(0, 1); // no energy saving
        sdu.write_bits(0, 1); // no scch
        sdu.write_bits(1, 1); // m-bit
        sdu.write_bits(13, 4); // cell type control
        sdu.write_bits(4, 11);
        sdu.write_bits(0b1011, 4);
        sdu.write_bits(0, 1); // trailing m-bit
        sdu.seek(0);

        let mm = MobileManagementPacket::parse(mle_with_sdu(Direction::Dl, sdu)).unwrap();
        let accept = mm.location_update_accept.unwrap();
        let element = &accept.optional_elements[&MmType34ElemIdDl::CellTypeControl];
        assert_eq!(element.unparsed_bits.to_bitstr(), "1011");
    }

    #[test]
    fn uplink_types_stay_opaque() {
        let mut sdu = BitBuffer::new_autoexpand(16);
        sdu.write_bits(2, 4); // U-LOCATION UPDATE DEMAND
        sdu.write_bits(0xAB, 8);
        sdu.seek(0);

        let mm = MobileManagementPacket::parse(mle_with_sdu(Direction::Ul, sdu)).unwrap();
        assert_eq!(
            mm.packet_type,
            MmPacketType::Uplink(MmUplinkPacketType::ULocationUpdateDemand)
        );
        assert!(mm.location_update_accept.is_none());
    }
}

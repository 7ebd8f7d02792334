//! Mobile Link Entity: protocol discriminator dispatch (Clause 18).

use tetra_core::{BitBuffer, PduParseErr};

use crate::llc::LogicalLinkControlPacket;

/// The protocol carried inside an MLE packet (Clause 18.5.21).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MleProtocol {
    Reserved0,
    Mm,
    Cmce,
    Reserved3,
    Sndcp,
    Mle,
    TetraManagementEntity,
    ReservedForTesting,
}

impl MleProtocol {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => MleProtocol::Reserved0,
            1 => MleProtocol::Mm,
            2 => MleProtocol::Cmce,
            3 => MleProtocol::Reserved3,
            4 => MleProtocol::Sndcp,
            5 => MleProtocol::Mle,
            6 => MleProtocol::TetraManagementEntity,
            _ => MleProtocol::ReservedForTesting,
        }
    }

    pub fn discriminant(self) -> u8 {
        match self {
            MleProtocol::Reserved0 => 0,
            MleProtocol::Mm => 1,
            MleProtocol::Cmce => 2,
            MleProtocol::Reserved3 => 3,
            MleProtocol::Sndcp => 4,
            MleProtocol::Mle => 5,
            MleProtocol::TetraManagementEntity => 6,
            MleProtocol::ReservedForTesting => 7,
        }
    }
}

/// The packet parsed in the MLE layer.
#[derive(Debug, Clone)]
pub struct MobileLinkEntityPacket {
    pub llc: LogicalLinkControlPacket,
    pub mle_protocol: MleProtocol,
    /// the SDU handed to MM/CMCE/SNDCP
    pub sdu: BitBuffer,
    /// MLE-protocol service PDU type (3 bits), when the discriminator is
    /// the MLE protocol itself
    pub mle_service_pdu_type: Option<u8>,
    /// extended PDU subtype nibble, when the service PDU type is 0b111
    pub mle_extended_pdu_type: Option<u8>,
}

impl MobileLinkEntityPacket {
    pub fn parse(llc: LogicalLinkControlPacket) -> Result<Self, PduParseErr> {
        let mut sdu = llc.tl_sdu.clone();
        sdu.seek(0);

        let discriminator = sdu.read_field(3, "protocol_discriminator")? as u8;
        let mle_protocol = MleProtocol::from_raw(discriminator);

        // MLE service PDUs carry their own type and, for 0b111, an extended
        // subtype nibble; the dispatch is recorded but not parsed deeper
        let mut mle_service_pdu_type = None;
        let mut mle_extended_pdu_type = None;
        if mle_protocol == MleProtocol::Mle && sdu.bits_left() >= 3 {
            let pdu_type = sdu.read_field(3, "mle_pdu_type")? as u8;
            mle_service_pdu_type = Some(pdu_type);
            if pdu_type == 0b111 && sdu.bits_left() >= 4 {
                mle_extended_pdu_type = Some(sdu.read_field(4, "mle_extended_pdu_type")? as u8);
            }
        }

        Ok(MobileLinkEntityPacket {
            llc,
            mle_protocol,
            sdu,
            mle_service_pdu_type,
            mle_extended_pdu_type,
        })
    }
}

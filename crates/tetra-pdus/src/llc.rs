//! Logical Link Control: basic link PDU parsing (Clause 22).

use tetra_core::{BitBuffer, PduParseErr};

use crate::umac::packet::UpperMacCPlaneSignallingPacket;

/// The basic link PDU types (Table 22.21).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicLinkType {
    BlAdataWithoutFcs,
    BlDataWithoutFcs,
    BlUdataWithoutFcs,
    BlAckWithoutFcs,
    BlAdataWithFcs,
    BlDataWithFcs,
    BlUdataWithFcs,
    BlAckWithFcs,
}

impl BasicLinkType {
    pub fn discriminant(self) -> u8 {
        match self {
            BasicLinkType::BlAdataWithoutFcs => 0,
            BasicLinkType::BlDataWithoutFcs => 1,
            BasicLinkType::BlUdataWithoutFcs => 2,
            BasicLinkType::BlAckWithoutFcs => 3,
            BasicLinkType::BlAdataWithFcs => 4,
            BasicLinkType::BlDataWithFcs => 5,
            BasicLinkType::BlUdataWithFcs => 6,
            BasicLinkType::BlAckWithFcs => 7,
        }
    }

    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0b0000 => Some(BasicLinkType::BlAdataWithoutFcs),
            0b0001 => Some(BasicLinkType::BlDataWithoutFcs),
            0b0010 => Some(BasicLinkType::BlUdataWithoutFcs),
            0b0011 => Some(BasicLinkType::BlAckWithoutFcs),
            0b0100 => Some(BasicLinkType::BlAdataWithFcs),
            0b0101 => Some(BasicLinkType::BlDataWithFcs),
            0b0110 => Some(BasicLinkType::BlUdataWithFcs),
            0b0111 => Some(BasicLinkType::BlAckWithFcs),
            _ => None,
        }
    }

    pub fn has_fcs(self) -> bool {
        self.discriminant() >= 0b0100
    }
}

/// Header fields of a basic link PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicLinkInformation {
    pub basic_link_type: BasicLinkType,
    pub n_r: Option<u8>,
    pub n_s: Option<u8>,
    /// verdict of the trailing 32-bit FCS, for the with-FCS variants
    pub fcs_good: Option<bool>,
}

impl BasicLinkInformation {
    /// Parse the basic link header from the TM-SDU. For the with-FCS
    /// variants the trailing 32 bits are stripped from the buffer and
    /// checked against the FCS computed over the remaining TL-SDU.
    pub fn from_buf(data: &mut BitBuffer) -> Result<Self, PduParseErr> {
        let raw = data.read_field(4, "llc_pdu_type")? as u8;
        let basic_link_type = BasicLinkType::from_raw(raw)
            .ok_or(PduParseErr::InvalidValue { field: "llc_pdu_type", value: raw as u64 })?;

        let mut info = BasicLinkInformation {
            basic_link_type,
            n_r: None,
            n_s: None,
            fcs_good: None,
        };
        match basic_link_type {
            BasicLinkType::BlAdataWithoutFcs | BasicLinkType::BlAdataWithFcs => {
                info.n_r = Some(data.read_field(1, "n_r")? as u8);
                info.n_s = Some(data.read_field(1, "n_s")? as u8);
            }
            BasicLinkType::BlDataWithoutFcs | BasicLinkType::BlDataWithFcs => {
                info.n_s = Some(data.read_field(1, "n_s")? as u8);
            }
            BasicLinkType::BlAckWithoutFcs | BasicLinkType::BlAckWithFcs => {
                info.n_r = Some(data.read_field(1, "n_r")? as u8);
            }
            BasicLinkType::BlUdataWithoutFcs | BasicLinkType::BlUdataWithFcs => {}
        }

        if basic_link_type.has_fcs() {
            let fcs = data.take_last(32)? as u32;
            let computed_fcs = data.compute_fcs();
            info.fcs_good = Some(fcs == computed_fcs);
        }

        Ok(info)
    }
}

/// The packet parsed in the LLC layer. Only basic link is fully parsed;
/// advanced link and layer-2 signalling PDUs pass through opaque.
#[derive(Debug, Clone)]
pub struct LogicalLinkControlPacket {
    pub mac: UpperMacCPlaneSignallingPacket,
    pub basic_link_information: Option<BasicLinkInformation>,
    /// the TL-SDU handed to the MLE; empty for non-basic-link PDUs
    pub tl_sdu: BitBuffer,
}

impl LogicalLinkControlPacket {
    pub fn parse(mac: UpperMacCPlaneSignallingPacket) -> Result<Self, PduParseErr> {
        let tm_sdu = mac
            .tm_sdu
            .as_ref()
            .ok_or(PduParseErr::BufferEnded { field: Some("tm_sdu") })?;
        let mut data = tm_sdu.clone();
        data.seek(0);

        let pdu_type = data
            .peek_bits(4)
            .ok_or(PduParseErr::BufferEnded { field: Some("llc_pdu_type") })?;

        // only basic link is parsed further
        if pdu_type <= 0b0111 {
            let basic_link_information = BasicLinkInformation::from_buf(&mut data)?;
            Ok(LogicalLinkControlPacket {
                mac,
                basic_link_information: Some(basic_link_information),
                tl_sdu: data,
            })
        } else {
            Ok(LogicalLinkControlPacket {
                mac,
                basic_link_information: None,
                tl_sdu: BitBuffer::new(0),
            })
        }
    }

    /// True for BL-ACK packets, which sinks usually suppress.
    pub fn is_acknowledgement(&self) -> bool {
        matches!(
            self.basic_link_information.map(|i| i.basic_link_type),
            Some(BasicLinkType::BlAckWithoutFcs) | Some(BasicLinkType::BlAckWithFcs)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetra_core::{Direction, LogicalChannel};

    use crate::umac::packet::MacPacketType;

    fn mac_packet_with_sdu(sdu: BitBuffer) -> UpperMacCPlaneSignallingPacket {
        let mut packet = UpperMacCPlaneSignallingPacket::new(
            LogicalChannel::SchF,
            Direction::Dl,
            MacPacketType::MacResource,
        );
        packet.tm_sdu = Some(sdu);
        packet
    }

    #[test]
    fn bl_udata_without_fcs() {
        let mut sdu = BitBuffer::new_autoexpand(32);
        sdu.write_bits(0b0010, 4);
        sdu.write_bits(0xAB, 8);
        sdu.seek(0);

        let llc = LogicalLinkControlPacket::parse(mac_packet_with_sdu(sdu)).unwrap();
        let info = llc.basic_link_information.unwrap();
        assert_eq!(info.basic_link_type, BasicLinkType::BlUdataWithoutFcs);
        assert_eq!(info.n_r, None);
        assert_eq!(info.n_s, None);
        assert_eq!(info.fcs_good, None);
        assert_eq!(llc.tl_sdu.bits_left(), 8);
    }

    #[test]
    fn bl_data_with_good_fcs() {
        // BL-DATA with FCS: type 0101, N(S), payload, then the FCS over the
        // payload appended at the tail
        let payload = BitBuffer::from_bitstr("0011001010111100");
        let fcs = payload.compute_fcs();

        let mut sdu = BitBuffer::new_autoexpand(64);
        sdu.write_bits(0b0101, 4);
        sdu.write_bits(1, 1); // N(S)
        sdu.write_bits(0b0011001010111100, 16);
        sdu.write_bits(fcs as u64, 32);
        sdu.seek(0);

        let llc = LogicalLinkControlPacket::parse(mac_packet_with_sdu(sdu)).unwrap();
        let info = llc.basic_link_information.unwrap();
        assert_eq!(info.basic_link_type, BasicLinkType::BlDataWithFcs);
        assert_eq!(info.n_s, Some(1));
        assert_eq!(info.fcs_good, Some(true));
        assert_eq!(llc.tl_sdu.to_bitstr(), "0011001010111100");
    }

    #[test]
    fn bl_data_with_corrupted_fcs() {
        let payload = BitBuffer::from_bitstr("0011001010111100");
        let fcs = payload.compute_fcs() ^ 0x10; // flip one FCS bit

        let mut sdu = BitBuffer::new_autoexpand(64);
        sdu.write_bits(0b0101, 4);
        sdu.write_bits(1, 1);
        sdu.write_bits(0b0011001010111100, 16);
        sdu.write_bits(fcs as u64, 32);
        sdu.seek(0);

        let llc = LogicalLinkControlPacket::parse(mac_packet_with_sdu(sdu)).unwrap();
        assert_eq!(llc.basic_link_information.unwrap().fcs_good, Some(false));
    }

    #[test]
    fn advanced_link_stays_opaque() {
        let mut sdu = BitBuffer::new_autoexpand(16);
        sdu.write_bits(0b1001, 4); // AL-DATA
        sdu.write_bits(0xFF, 8);
        sdu.seek(0);

        let llc = LogicalLinkControlPacket::parse(mac_packet_with_sdu(sdu)).unwrap();
        assert!(llc.basic_link_information.is_none());
        assert_eq!(llc.tl_sdu.bits_left(), 0);
    }
}

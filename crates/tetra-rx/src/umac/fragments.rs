//! Reassembly of fragmented C-plane PDUs across bursts.
//!
//! One state machine per direction. A start fragment opens (or restarts)
//! the chain, continuations append, the end marker emits the reassembled
//! packet carrying the start PDU's address and control fields and the
//! concatenated TM-SDU.

use tetra_core::{Direction, PduParseErr};
use tetra_pdus::umac::packet::{MacPacketType, UpperMacCPlaneSignallingPacket};

#[derive(Default)]
struct FragmentChain {
    start: Option<UpperMacCPlaneSignallingPacket>,
    continuations: Vec<UpperMacCPlaneSignallingPacket>,
}

impl FragmentChain {
    fn restart(&mut self, start: UpperMacCPlaneSignallingPacket) {
        self.start = Some(start);
        self.continuations.clear();
    }

    fn append(&mut self, fragment: UpperMacCPlaneSignallingPacket) {
        if self.start.is_some() {
            self.continuations.push(fragment);
        }
    }

    fn finish(
        &mut self,
        end: UpperMacCPlaneSignallingPacket,
    ) -> Option<UpperMacCPlaneSignallingPacket> {
        let mut packet = self.start.take()?;

        let mut tm_sdu = packet
            .tm_sdu
            .take()
            .unwrap_or_else(|| tetra_core::BitBuffer::new(0));
        for fragment in self.continuations.drain(..) {
            if let Some(sdu) = &fragment.tm_sdu {
                tm_sdu.append(sdu);
            }
        }
        if let Some(sdu) = &end.tm_sdu {
            tm_sdu.append(sdu);
        }
        packet.tm_sdu = Some(tm_sdu);

        Some(packet)
    }

    fn reset(&mut self) {
        self.start = None;
        self.continuations.clear();
    }
}

/// Fragment reassembler with independent downlink and uplink state.
#[derive(Default)]
pub struct FragmentReassembler {
    downlink: FragmentChain,
    uplink: FragmentChain,
}

impl FragmentReassembler {
    pub fn new() -> Self {
        FragmentReassembler::default()
    }

    /// Feed one fragment-bearing PDU. Returns the reassembled packet when
    /// `fragment` completes a chain. A PDU type that cannot legally appear
    /// in a fragment stream resets the direction's state and errors.
    pub fn push_fragment(
        &mut self,
        fragment: UpperMacCPlaneSignallingPacket,
    ) -> Result<Option<UpperMacCPlaneSignallingPacket>, PduParseErr> {
        let chain = match fragment.direction {
            Direction::Dl => &mut self.downlink,
            Direction::Ul => &mut self.uplink,
        };

        match fragment.ptype {
            MacPacketType::MacResource => {
                debug_assert!(fragment.fragmentation);
                chain.restart(fragment);
                Ok(None)
            }
            MacPacketType::MacAccess | MacPacketType::MacData => {
                debug_assert!(fragment.fragmentation);
                chain.restart(fragment);
                Ok(None)
            }
            MacPacketType::MacFragmentDownlink | MacPacketType::MacFragmentUplink => {
                chain.append(fragment);
                Ok(None)
            }
            MacPacketType::MacEndDownlink
            | MacPacketType::MacEndHu
            | MacPacketType::MacEndUplink => Ok(chain.finish(fragment)),
            MacPacketType::MacDBlck | MacPacketType::MacBroadcast | MacPacketType::MacUBlck
            | MacPacketType::MacUSignal => {
                chain.reset();
                Err(PduParseErr::Unexpected { field: "pdu type in fragment stream" })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetra_core::{Address, BitBuffer, LogicalChannel};

    fn packet(
        direction: Direction,
        ptype: MacPacketType,
        sdu_bits: Option<&str>,
    ) -> UpperMacCPlaneSignallingPacket {
        let mut packet =
            UpperMacCPlaneSignallingPacket::new(LogicalChannel::SchF, direction, ptype);
        packet.tm_sdu = sdu_bits.map(BitBuffer::from_bitstr);
        packet
    }

    fn start_packet(
        direction: Direction,
        ptype: MacPacketType,
        sdu_bits: &str,
    ) -> UpperMacCPlaneSignallingPacket {
        let mut start = packet(direction, ptype, Some(sdu_bits));
        start.fragmentation = true;
        start.address = Address { ssi: Some(0xBEEF), ..Address::default() };
        start
    }

    #[test]
    fn downlink_chain_reassembles_in_order() {
        let mut reassembler = FragmentReassembler::new();

        // tm_sdus 0xAA 0xBB | 0xCC | 0xDD 0xEE
        let start = start_packet(Direction::Dl, MacPacketType::MacResource, "1010101010111011");
        assert!(reassembler.push_fragment(start).unwrap().is_none());

        let frag = packet(Direction::Dl, MacPacketType::MacFragmentDownlink, Some("11001100"));
        assert!(reassembler.push_fragment(frag).unwrap().is_none());

        let end = packet(Direction::Dl, MacPacketType::MacEndDownlink, Some("1101110111101110"));
        let reassembled = reassembler.push_fragment(end).unwrap().unwrap();

        assert_eq!(reassembled.ptype, MacPacketType::MacResource);
        assert_eq!(reassembled.address.ssi, Some(0xBEEF));
        assert_eq!(
            reassembled.tm_sdu.unwrap().to_bitstr(),
            "1010101010111011110011001101110111101110"
        );

        // the chain is cleared after emission
        let stray_end = packet(Direction::Dl, MacPacketType::MacEndDownlink, Some("1111"));
        assert!(reassembler.push_fragment(stray_end).unwrap().is_none());
    }

    #[test]
    fn continuation_without_start_is_ignored() {
        let mut reassembler = FragmentReassembler::new();
        let frag = packet(Direction::Dl, MacPacketType::MacFragmentDownlink, Some("1010"));
        assert!(reassembler.push_fragment(frag).unwrap().is_none());
        let end = packet(Direction::Dl, MacPacketType::MacEndDownlink, Some("1100"));
        assert!(reassembler.push_fragment(end).unwrap().is_none());
    }

    #[test]
    fn new_start_discards_previous_chain() {
        let mut reassembler = FragmentReassembler::new();

        let first = start_packet(Direction::Dl, MacPacketType::MacResource, "0001");
        reassembler.push_fragment(first).unwrap();
        let frag = packet(Direction::Dl, MacPacketType::MacFragmentDownlink, Some("0010"));
        reassembler.push_fragment(frag).unwrap();

        let second = start_packet(Direction::Dl, MacPacketType::MacResource, "0100");
        reassembler.push_fragment(second).unwrap();
        let end = packet(Direction::Dl, MacPacketType::MacEndDownlink, Some("1000"));
        let reassembled = reassembler.push_fragment(end).unwrap().unwrap();

        assert_eq!(reassembled.tm_sdu.unwrap().to_bitstr(), "01001000");
    }

    #[test]
    fn directions_are_independent() {
        let mut reassembler = FragmentReassembler::new();

        let dl_start = start_packet(Direction::Dl, MacPacketType::MacResource, "1111");
        reassembler.push_fragment(dl_start).unwrap();

        let ul_start = start_packet(Direction::Ul, MacPacketType::MacData, "0000");
        reassembler.push_fragment(ul_start).unwrap();

        let ul_end = packet(Direction::Ul, MacPacketType::MacEndUplink, Some("0101"));
        let ul_packet = reassembler.push_fragment(ul_end).unwrap().unwrap();
        assert_eq!(ul_packet.ptype, MacPacketType::MacData);
        assert_eq!(ul_packet.tm_sdu.unwrap().to_bitstr(), "00000101");

        // the downlink chain is still waiting for its end marker
        let dl_end = packet(Direction::Dl, MacPacketType::MacEndDownlink, Some("1010"));
        let dl_packet = reassembler.push_fragment(dl_end).unwrap().unwrap();
        assert_eq!(dl_packet.tm_sdu.unwrap().to_bitstr(), "11111010");
    }

    #[test]
    fn illegal_pdu_resets_chain_with_error() {
        let mut reassembler = FragmentReassembler::new();

        let start = start_packet(Direction::Dl, MacPacketType::MacResource, "1111");
        reassembler.push_fragment(start).unwrap();

        let dblck = packet(Direction::Dl, MacPacketType::MacDBlck, Some("0000"));
        assert!(reassembler.push_fragment(dblck).is_err());

        // the chain was reset; the end no longer completes anything
        let end = packet(Direction::Dl, MacPacketType::MacEndDownlink, Some("1010"));
        assert!(reassembler.push_fragment(end).unwrap().is_none());
    }

    #[test]
    fn mac_end_hu_completes_uplink_chain() {
        let mut reassembler = FragmentReassembler::new();

        let start = start_packet(Direction::Ul, MacPacketType::MacAccess, "110011");
        reassembler.push_fragment(start).unwrap();
        let frag = packet(Direction::Ul, MacPacketType::MacFragmentUplink, Some("01"));
        reassembler.push_fragment(frag).unwrap();
        let end = packet(Direction::Ul, MacPacketType::MacEndHu, Some("10"));

        let reassembled = reassembler.push_fragment(end).unwrap().unwrap();
        assert_eq!(reassembled.ptype, MacPacketType::MacAccess);
        assert_eq!(reassembled.tm_sdu.unwrap().to_bitstr(), "1100110110");
    }
}

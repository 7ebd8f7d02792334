//! The in-order consumer of lower-MAC results.
//!
//! Owns every piece of per-cell state: the published cell lock (scrambling
//! code and timebase), the fragment reassembler and the decode counters.
//! Lower-MAC workers may run bursts out of order, but this stage sees their
//! results strictly in submission order, so all state mutation here is
//! sequential.

use std::sync::{Arc, RwLock};

use crossbeam_channel::Sender;
use tetra_pdus::parser;
use tetra_pdus::umac::bsch::BroadcastSynchronizationChannel;
use tetra_pdus::umac::builder;
use tetra_pdus::umac::packet::UpperMacPackets;

use crate::egress::EgressItem;
use crate::lmac::lower_mac::{CellLockUpdate, LowerMacOutput};
use crate::umac::fragments::FragmentReassembler;

/// Cell state shared with the ingress thread, which snapshots it when
/// submitting lower-MAC work. Only the consumer writes.
pub type SharedCellState = Arc<RwLock<Option<BroadcastSynchronizationChannel>>>;

#[derive(Debug, Default, Clone, Copy)]
pub struct Counters {
    pub bursts_received: u64,
    pub slots_decoded: u64,
    pub packets_decoded: u64,
    pub decode_errors: u64,
}

pub struct UpperMac {
    cell: SharedCellState,
    fragments: FragmentReassembler,
    egress: Sender<EgressItem>,
    counters: Counters,
}

impl UpperMac {
    pub fn new(cell: SharedCellState, egress: Sender<EgressItem>) -> Self {
        UpperMac {
            cell,
            fragments: FragmentReassembler::new(),
            egress,
            counters: Counters::default(),
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Consume one in-order lower-MAC result.
    pub fn process(&mut self, output: LowerMacOutput) {
        self.counters.bursts_received += 1;
        if output.decode_error {
            self.counters.decode_errors += 1;
        }

        // publish the cell lock and advance the timebase: exactly one tick
        // per received downlink burst, replaced wholesale on a decoded SB
        match output.cell_lock {
            CellLockUpdate::Acquire(sync) => {
                let mut cell = self.cell.write().unwrap();
                if cell.is_none() {
                    tracing::info!("cell lock acquired: {}", sync);
                }
                *cell = Some(sync);
            }
            CellLockUpdate::Lose => {
                let mut cell = self.cell.write().unwrap();
                if cell.is_some() {
                    tracing::info!("cell lock lost");
                }
                *cell = None;
            }
            CellLockUpdate::Keep => {
                if output.burst_type.is_downlink() {
                    let mut cell = self.cell.write().unwrap();
                    if let Some(sync) = cell.as_mut() {
                        sync.time.increment();
                    }
                }
            }
        }

        let Some(slots) = output.slots else {
            return;
        };

        if slots.has_crc_error() {
            // surface the raw slots for offline re-analysis
            let _ = self.egress.send(EgressItem::FailedSlots(slots.clone()));
        }

        let packets = match builder::parse_slots(&slots) {
            Ok(packets) => packets,
            Err(e) => {
                tracing::debug!("upper mac parse failed: {:?}", e);
                self.counters.decode_errors += 1;
                let _ = self.egress.send(EgressItem::FailedSlots(slots));
                return;
            }
        };
        self.counters.slots_decoded += 1;

        self.process_packets(packets);
    }

    fn process_packets(&mut self, packets: UpperMacPackets) {
        for packet in packets.c_plane_signalling_packets {
            if packet.is_downlink_fragment() || packet.is_uplink_fragment() || packet.is_fragment_end()
            {
                match self.fragments.push_fragment(packet) {
                    Ok(Some(reassembled)) => self.emit_packet_chain(reassembled),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!("fragment protocol violation: {:?}", e);
                        self.counters.decode_errors += 1;
                    }
                }
            } else if packet.tm_sdu.is_some() {
                self.emit_packet_chain(packet);
            }
            // null PDUs and bare capacity requests carry nothing upward
        }

        if let Some(broadcast) = packets.broadcast_packet {
            tracing::debug!("broadcast on {}: sysinfo={}", broadcast.logical_channel,
                broadcast.sysinfo.is_some());
        }
        for signalling in &packets.u_plane_signalling_packets {
            tracing::debug!("u-plane signalling, {} sdu bits", signalling.tm_sdu.bits_left());
        }
        if let Some(traffic) = &packets.u_plane_traffic_packet {
            tracing::trace!("traffic slot, {} bits", traffic.data.get_len());
        }
    }

    fn emit_packet_chain(
        &mut self,
        packet: tetra_pdus::umac::packet::UpperMacCPlaneSignallingPacket,
    ) {
        match parser::parse_packet_chain(packet) {
            Ok(decoded) => {
                self.counters.packets_decoded += 1;
                let _ = self.egress.send(EgressItem::Packet(decoded));
            }
            Err(e) => {
                tracing::debug!("packet chain parse failed: {:?}", e);
                self.counters.decode_errors += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use tetra_core::{BitBuffer, BurstType, LogicalChannel, LogicalChannelDataAndCrc, TdmaTime};
    use tetra_pdus::umac::slot::{Slot, Slots, SlotsType};

    fn shared_cell() -> SharedCellState {
        Arc::new(RwLock::new(None))
    }

    fn sch_f_slot_with_bl_udata() -> Slots {
        // MAC-RESOURCE wrapping BL-UDATA without FCS and an MLE/CMCE header
        let mut data = BitBuffer::new_autoexpand(128);
        data.write_bits(0b00, 2); // MAC-RESOURCE
        data.write_bits(0, 1);
        data.write_bits(0, 1);
        data.write_bits(0b00, 2);
        data.write_bits(0, 1);
        data.write_bits(8, 6); // 8 octets
        data.write_bits(0b001, 3); // SSI
        data.write_bits(0x000042, 24);
        data.write_bits(0, 1);
        data.write_bits(0, 1);
        data.write_bits(0, 1);
        // 21 bits of TM-SDU: BL-UDATA (4) + MLE CMCE discriminator (3) +
        // 14 more bits of CMCE pdu type and padding
        data.write_bits(0b0010, 4);
        data.write_bits(0b010, 3);
        data.write_bits(7, 5); // D-SETUP
        data.write_bits(0x1FF, 9);
        data.seek(0);

        Slots::new(
            BurstType::Ndb,
            SlotsType::FullSlot,
            Slot::single(LogicalChannelDataAndCrc {
                channel: LogicalChannel::SchF,
                data,
                crc_ok: true,
            }),
        )
        .unwrap()
    }

    #[test]
    fn cell_lock_publication_and_timebase() {
        let cell = shared_cell();
        let (tx, _rx) = unbounded();
        let mut upper_mac = UpperMac::new(Arc::clone(&cell), tx);

        let sync = BroadcastSynchronizationChannel::with_scrambling_code(0x1234);
        upper_mac.process(LowerMacOutput {
            burst_type: BurstType::Sdb,
            slots: None,
            cell_lock: CellLockUpdate::Acquire(sync),
            decode_error: false,
        });
        assert_eq!(cell.read().unwrap().unwrap().scrambling_code, 0x1234);
        assert_eq!(cell.read().unwrap().unwrap().time, TdmaTime::new(1, 1, 1));

        // a downlink burst advances the timebase once
        upper_mac.process(LowerMacOutput {
            burst_type: BurstType::Ndb,
            slots: None,
            cell_lock: CellLockUpdate::Keep,
            decode_error: false,
        });
        assert_eq!(cell.read().unwrap().unwrap().time, TdmaTime::new(2, 1, 1));

        // uplink bursts do not
        upper_mac.process(LowerMacOutput {
            burst_type: BurstType::Nub,
            slots: None,
            cell_lock: CellLockUpdate::Keep,
            decode_error: false,
        });
        assert_eq!(cell.read().unwrap().unwrap().time, TdmaTime::new(2, 1, 1));

        upper_mac.process(LowerMacOutput {
            burst_type: BurstType::Sdb,
            slots: None,
            cell_lock: CellLockUpdate::Lose,
            decode_error: true,
        });
        assert!(cell.read().unwrap().is_none());
        assert_eq!(upper_mac.counters().decode_errors, 1);
    }

    #[test]
    fn decoded_slot_reaches_the_egress_queue() {
        let (tx, rx) = unbounded();
        let mut upper_mac = UpperMac::new(shared_cell(), tx);

        upper_mac.process(LowerMacOutput {
            burst_type: BurstType::Ndb,
            slots: Some(sch_f_slot_with_bl_udata()),
            cell_lock: CellLockUpdate::Keep,
            decode_error: false,
        });

        let item = rx.try_recv().expect("expected one egress packet");
        let EgressItem::Packet(packet) = item else {
            panic!("expected a packet item");
        };
        assert_eq!(packet.key(), "CircuitModeControlEntityPacket");
        assert_eq!(upper_mac.counters().packets_decoded, 1);
    }

    #[test]
    fn crc_failed_slots_are_surfaced_raw() {
        let (tx, rx) = unbounded();
        let mut upper_mac = UpperMac::new(shared_cell(), tx);

        let slots = Slots::new(
            BurstType::Ndb,
            SlotsType::OneSubslot,
            Slot::single(LogicalChannelDataAndCrc {
                channel: LogicalChannel::SchHd,
                data: BitBuffer::from_bitstr("0101"),
                crc_ok: false,
            }),
        )
        .unwrap();

        upper_mac.process(LowerMacOutput {
            burst_type: BurstType::Ndb,
            slots: Some(slots),
            cell_lock: CellLockUpdate::Keep,
            decode_error: true,
        });

        assert!(matches!(rx.try_recv(), Ok(EgressItem::FailedSlots(_))));
    }
}

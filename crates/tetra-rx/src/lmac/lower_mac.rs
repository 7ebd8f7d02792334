//! Lower MAC: turn an aligned burst into logical-channel slots.
//!
//! Each burst layout is a set of slices into the 510-bit frame plus the
//! decoding chain for every slice. Processing is a pure function of
//! `(frame, burst type, cell lock snapshot)` so bursts can decode on any
//! worker; all cell state mutation happens in the in-order consumer.

use std::sync::Mutex;

use tetra_core::{BitBuffer, BurstType, LogicalChannel, LogicalChannelDataAndCrc, TdmaTime};
use tetra_pdus::umac::aach::{AccessAssignmentChannel, DownlinkUsage};
use tetra_pdus::umac::bsch::BroadcastSynchronizationChannel;
use tetra_pdus::umac::slot::{Slot, Slots, SlotsType};

use crate::lmac::errorcontrol::{
    self, BSCH_PARAMS, SCH_F_PARAMS, SCH_HD_PARAMS, SCH_HU_PARAMS,
};
use crate::lmac::scrambler::{SCRAMB_INIT, ScramblerCache};
use crate::lmac::viterbi::TetraViterbiDecoder;

/// What a decoded synchronization burst does to the cell lock.
#[derive(Debug, Clone, Copy)]
pub enum CellLockUpdate {
    /// not a synchronization burst, lock unchanged
    Keep,
    /// SB decoded, new cell lock
    Acquire(BroadcastSynchronizationChannel),
    /// SB failed its CRC, lock lost until the next good SB
    Lose,
}

/// Result of lower-MAC processing of one burst.
pub struct LowerMacOutput {
    pub burst_type: BurstType,
    pub slots: Option<Slots>,
    pub cell_lock: CellLockUpdate,
    pub decode_error: bool,
}

pub struct LowerMac {
    decoder: TetraViterbiDecoder,
    // memoization of per-seed scrambling tables, shared across workers
    scrambler: Mutex<ScramblerCache>,
}

impl Default for LowerMac {
    fn default() -> Self {
        Self::new()
    }
}

impl LowerMac {
    pub fn new() -> Self {
        LowerMac {
            decoder: TetraViterbiDecoder::new(),
            scrambler: Mutex::new(ScramblerCache::new()),
        }
    }

    /// Process one aligned burst with the given cell lock snapshot.
    pub fn process(
        &self,
        frame: &[u8],
        burst_type: BurstType,
        bsch: Option<&BroadcastSynchronizationChannel>,
    ) -> LowerMacOutput {
        let mut decode_error = false;

        tracing::trace!("decoding {}", burst_type);

        // A synchronization burst replaces the cell lock; a corrupt one
        // drops it until the next good SB.
        let mut cell_lock = CellLockUpdate::Keep;
        let mut current_sync = bsch.copied();
        if burst_type == BurstType::Sdb {
            let mut sb_input = [0u8; 120];
            sb_input.copy_from_slice(&frame[94..214]);
            let (mut sb_bits, sb_crc_ok) = self.decode_cp(&BSCH_PARAMS, &sb_input, SCRAMB_INIT);

            let mut new_sync = None;
            if sb_crc_ok {
                match BroadcastSynchronizationChannel::from_buf(&mut sb_bits) {
                    Ok(sync) => new_sync = Some(sync),
                    Err(e) => {
                        tracing::warn!("bsch field parse failed: {:?}", e);
                        decode_error = true;
                    }
                }
            } else {
                decode_error = true;
            }

            cell_lock = match new_sync {
                Some(sync) => CellLockUpdate::Acquire(sync),
                None => CellLockUpdate::Lose,
            };
            current_sync = new_sync;
        }

        // Without a cell lock (and no injected uplink scrambling code) the
        // frame cannot be descrambled and is dropped.
        let Some(sync) = current_sync else {
            return LowerMacOutput { burst_type, slots: None, cell_lock, decode_error };
        };

        let slots = match self.process_channels(frame, burst_type, &sync) {
            Ok(slots) => Some(slots),
            Err(e) => {
                tracing::warn!("slot construction failed for {}: {:?}", burst_type, e);
                decode_error = true;
                None
            }
        };

        if let Some(slots) = &slots {
            decode_error |= slots.has_crc_error();
        }

        LowerMacOutput { burst_type, slots, cell_lock, decode_error }
    }

    fn decode_cp(
        &self,
        params: &errorcontrol::ErrorControlParams,
        type5: &[u8],
        scrambling_code: u32,
    ) -> (BitBuffer, bool) {
        let mut scrambler = self.scrambler.lock().unwrap();
        errorcontrol::decode_cp(&self.decoder, &mut scrambler, params, type5, scrambling_code)
    }

    fn decode_aach(
        &self,
        burst_type: BurstType,
        time: TdmaTime,
        type5: &[u8; 30],
        scrambling_code: u32,
    ) -> Option<AccessAssignmentChannel> {
        let bits = {
            let mut scrambler = self.scrambler.lock().unwrap();
            errorcontrol::decode_aach(&mut scrambler, type5, scrambling_code)
        };
        let mut buf = BitBuffer::from_bits(&bits);
        match AccessAssignmentChannel::from_buf(burst_type, time, &mut buf) {
            Ok(aach) => Some(aach),
            Err(e) => {
                tracing::warn!("aach parse failed: {:?}", e);
                None
            }
        }
    }

    fn descramble(&self, bits: &mut [u8], scrambling_code: u32) {
        let mut scrambler = self.scrambler.lock().unwrap();
        errorcontrol::descramble_traffic(&mut scrambler, bits, scrambling_code);
    }

    /// The layout-specific decoding pipelines.
    fn process_channels(
        &self,
        frame: &[u8],
        burst_type: BurstType,
        sync: &BroadcastSynchronizationChannel,
    ) -> Result<Slots, tetra_core::PduParseErr> {
        let code = sync.scrambling_code;

        match burst_type {
            BurstType::Sdb => {
                // broadcast block, only parsed for completeness here
                let mut bb_input = [0u8; 30];
                bb_input.copy_from_slice(&frame[252..282]);
                let _aach = self.decode_aach(burst_type, sync.time, &bb_input, code);

                // second half slot carries any of SCH/HD, BNCH, STCH
                let mut bkn2_input = [0u8; 216];
                bkn2_input.copy_from_slice(&frame[282..498]);
                let (bkn2_bits, crc_ok) = self.decode_cp(&SCH_HD_PARAMS, &bkn2_input, code);

                Slots::new(
                    burst_type,
                    SlotsType::OneSubslot,
                    Slot::single(LogicalChannelDataAndCrc {
                        channel: LogicalChannel::SchHd,
                        data: bkn2_bits,
                        crc_ok,
                    }),
                )
            }
            BurstType::Ndb => {
                let mut bb_input = [0u8; 30];
                for (i, bit) in bb_input.iter_mut().enumerate() {
                    let offset = if i >= 14 { 252 } else { 230 };
                    *bit = frame[offset + i];
                }
                let aach = self.decode_aach(burst_type, sync.time, &bb_input, code);

                // TCH or SCH/F
                let mut bkn1_input = [0u8; 432];
                for (i, bit) in bkn1_input.iter_mut().enumerate() {
                    let offset = if i >= 216 { 66 } else { 14 };
                    *bit = frame[offset + i];
                }

                if aach.map(|a| a.downlink_usage) == Some(DownlinkUsage::Traffic) {
                    // full-slot traffic is type-4 bits, descrambled only
                    let mut descrambled = bkn1_input;
                    self.descramble(&mut descrambled, code);
                    Slots::new(
                        burst_type,
                        SlotsType::FullSlot,
                        Slot::single(LogicalChannelDataAndCrc {
                            channel: LogicalChannel::Tch,
                            data: BitBuffer::from_bits(&descrambled),
                            crc_ok: true,
                        }),
                    )
                } else {
                    let (bkn1_bits, crc_ok) = self.decode_cp(&SCH_F_PARAMS, &bkn1_input, code);
                    Slots::new(
                        burst_type,
                        SlotsType::FullSlot,
                        Slot::single(LogicalChannelDataAndCrc {
                            channel: LogicalChannel::SchF,
                            data: bkn1_bits,
                            crc_ok,
                        }),
                    )
                }
            }
            BurstType::NdbSplit => {
                let mut bb_input = [0u8; 30];
                for (i, bit) in bb_input.iter_mut().enumerate() {
                    let offset = if i >= 14 { 252 } else { 230 };
                    *bit = frame[offset + i];
                }
                let aach = self.decode_aach(burst_type, sync.time, &bb_input, code);

                let mut bkn1_input = [0u8; 216];
                bkn1_input.copy_from_slice(&frame[14..230]);
                let (bkn1_bits, bkn1_crc_ok) = self.decode_cp(&SCH_HD_PARAMS, &bkn1_input, code);

                let mut bkn2_input = [0u8; 216];
                bkn2_input.copy_from_slice(&frame[282..498]);
                let (bkn2_bits, bkn2_crc_ok) = self.decode_cp(&SCH_HD_PARAMS, &bkn2_input, code);

                if aach.map(|a| a.downlink_usage) == Some(DownlinkUsage::Traffic) {
                    // STCH + TCH or STCH + STCH; half-slot traffic is
                    // type-3 bits (descrambled and deinterleaved)
                    let bkn2_deinterleaved = self.descramble_and_deinterleave(&bkn2_input, code);
                    Slots::new_split(
                        burst_type,
                        SlotsType::TwoSubslots,
                        Slot::single(LogicalChannelDataAndCrc {
                            channel: LogicalChannel::Stch,
                            data: bkn1_bits,
                            crc_ok: bkn1_crc_ok,
                        }),
                        Slot::ambiguous(vec![
                            LogicalChannelDataAndCrc {
                                channel: LogicalChannel::Stch,
                                data: bkn2_bits,
                                crc_ok: bkn2_crc_ok,
                            },
                            LogicalChannelDataAndCrc {
                                channel: LogicalChannel::Tch,
                                data: BitBuffer::from_bits(&bkn2_deinterleaved),
                                crc_ok: true,
                            },
                        ])?,
                    )
                } else {
                    // SCH/HD + SCH/HD or SCH/HD + BNCH
                    Slots::new_split(
                        burst_type,
                        SlotsType::TwoSubslots,
                        Slot::single(LogicalChannelDataAndCrc {
                            channel: LogicalChannel::SchHd,
                            data: bkn1_bits,
                            crc_ok: bkn1_crc_ok,
                        }),
                        Slot::single(LogicalChannelDataAndCrc {
                            channel: LogicalChannel::SchHd,
                            data: bkn2_bits,
                            crc_ok: bkn2_crc_ok,
                        }),
                    )
                }
            }
            BurstType::Cub => {
                let mut cb_input = [0u8; 168];
                for (i, bit) in cb_input.iter_mut().enumerate() {
                    let offset = if i >= 84 { 34 } else { 4 };
                    *bit = frame[offset + i];
                }
                let (cb_bits, crc_ok) = self.decode_cp(&SCH_HU_PARAMS, &cb_input, code);

                Slots::new(
                    burst_type,
                    SlotsType::OneSubslot,
                    Slot::single(LogicalChannelDataAndCrc {
                        channel: LogicalChannel::SchHu,
                        data: cb_bits,
                        crc_ok,
                    }),
                )
            }
            BurstType::Nub => {
                let mut bkn1_input = [0u8; 432];
                for (i, bit) in bkn1_input.iter_mut().enumerate() {
                    let offset = if i >= 216 { 26 } else { 4 };
                    *bit = frame[offset + i];
                }

                // Either SCH/F or TCH depending on the uplink usage marker,
                // which lives on the downlink we may not be watching. Keep
                // both candidates; slot construction defaults to signalling.
                let mut descrambled = bkn1_input;
                self.descramble(&mut descrambled, code);
                let (bkn1_bits, crc_ok) = self.decode_cp(&SCH_F_PARAMS, &bkn1_input, code);

                Slots::new(
                    burst_type,
                    SlotsType::FullSlot,
                    Slot::ambiguous(vec![
                        LogicalChannelDataAndCrc {
                            channel: LogicalChannel::SchF,
                            data: bkn1_bits,
                            crc_ok,
                        },
                        LogicalChannelDataAndCrc {
                            channel: LogicalChannel::Tch,
                            data: BitBuffer::from_bits(&descrambled),
                            crc_ok: true,
                        },
                    ])?,
                )
            }
            BurstType::NubSplit => {
                let mut bkn1_input = [0u8; 216];
                bkn1_input.copy_from_slice(&frame[4..220]);
                let (bkn1_bits, bkn1_crc_ok) = self.decode_cp(&SCH_HD_PARAMS, &bkn1_input, code);

                let mut bkn2_input = [0u8; 216];
                bkn2_input.copy_from_slice(&frame[242..458]);
                let (bkn2_bits, bkn2_crc_ok) = self.decode_cp(&SCH_HD_PARAMS, &bkn2_input, code);
                let bkn2_deinterleaved = self.descramble_and_deinterleave(&bkn2_input, code);

                // STCH + TCH or STCH + STCH
                Slots::new_split(
                    burst_type,
                    SlotsType::TwoSubslots,
                    Slot::single(LogicalChannelDataAndCrc {
                        channel: LogicalChannel::Stch,
                        data: bkn1_bits,
                        crc_ok: bkn1_crc_ok,
                    }),
                    Slot::ambiguous(vec![
                        LogicalChannelDataAndCrc {
                            channel: LogicalChannel::Stch,
                            data: bkn2_bits,
                            crc_ok: bkn2_crc_ok,
                        },
                        LogicalChannelDataAndCrc {
                            channel: LogicalChannel::Tch,
                            data: BitBuffer::from_bits(&bkn2_deinterleaved),
                            crc_ok: true,
                        },
                    ])?,
                )
            }
        }
    }

    fn descramble_and_deinterleave(&self, type5: &[u8; 216], scrambling_code: u32) -> [u8; 216] {
        let mut descrambled = *type5;
        self.descramble(&mut descrambled, scrambling_code);
        let mut deinterleaved = [0u8; 216];
        crate::lmac::interleaver::block_deinterleave(216, 101, &descrambled, &mut deinterleaved);
        deinterleaved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lmac::errorcontrol::testenc::{encode_aach, encode_cp};

    const TEST_SCRAMBLING_CODE: u32 = ((7u32 | (16383 << 6) | (262 << 20)) << 2) | 0b11;

    /// 60 BSCH type-1 bits for system code 0b1001, colour code 7, time
    /// 1/1/1, mcc 262, mnc 16383, everything else zero.
    fn bsch_type1() -> Vec<u8> {
        let mut buf = BitBuffer::new(60);
        buf.write_bits(0b1001, 4);
        buf.write_bits(7, 6); // colour code
        buf.write_bits(0, 2); // time slot 1
        buf.write_bits(1, 5); // frame 1
        buf.write_bits(1, 6); // multiframe 1
        buf.write_bits(0, 12); // sharing, reserved frames, dtx, f18, reserved
        buf.write_bits(262, 10);
        buf.write_bits(16383, 14);
        buf.write_bits(0, 6);
        buf.seek(0);
        let mut bits = vec![0u8; 60];
        buf.peek_bitarr(&mut bits);
        bits
    }

    fn build_sync_burst() -> Vec<u8> {
        let mut scrambler = ScramblerCache::new();
        let mut frame = vec![0u8; 510];

        // SB block at 94..214, scrambled with the BSCH seed
        let sb = encode_cp(&mut scrambler, &BSCH_PARAMS, &bsch_type1(), SCRAMB_INIT);
        frame[94..214].copy_from_slice(&sb);

        // AACH at 252..282 with common control, cell seed
        let aach = encode_aach(&mut scrambler, 0, TEST_SCRAMBLING_CODE);
        frame[252..282].copy_from_slice(&aach);

        // zero SCH/HD block with valid CRC at 282..498, cell seed
        let bkn2 = encode_cp(
            &mut scrambler,
            &SCH_HD_PARAMS,
            &vec![0u8; SCH_HD_PARAMS.type1_bits],
            TEST_SCRAMBLING_CODE,
        );
        frame[282..498].copy_from_slice(&bkn2);

        frame
    }

    #[test]
    fn synchronization_burst_acquires_cell_lock() {
        let lower_mac = LowerMac::new();
        let frame = build_sync_burst();

        let output = lower_mac.process(&frame, BurstType::Sdb, None);

        assert!(!output.decode_error);
        let CellLockUpdate::Acquire(sync) = output.cell_lock else {
            panic!("expected a cell lock acquisition");
        };
        assert_eq!(sync.system_code, 0b1001);
        assert_eq!(sync.color_code, 7);
        assert_eq!(sync.mobile_country_code, 262);
        assert_eq!(sync.mobile_network_code, 16383);
        assert_eq!(sync.scrambling_code, TEST_SCRAMBLING_CODE);
        assert_eq!(sync.time, TdmaTime::new(1, 1, 1));

        let slots = output.slots.expect("sync burst carries a SCH/HD slot");
        let slot = slots.first_slot().data();
        assert_eq!(slot.channel, LogicalChannel::SchHd);
        assert!(slot.crc_ok);
        assert_eq!(slot.data.get_len(), 124);
    }

    #[test]
    fn burst_without_cell_lock_is_dropped() {
        let lower_mac = LowerMac::new();
        let frame = vec![0u8; 510];

        let output = lower_mac.process(&frame, BurstType::Ndb, None);
        assert!(output.slots.is_none());
        assert!(matches!(output.cell_lock, CellLockUpdate::Keep));
    }

    #[test]
    fn corrupt_sync_burst_drops_cell_lock() {
        let lower_mac = LowerMac::new();
        let mut frame = build_sync_burst();
        // trash the SB block beyond repair
        for bit in frame[94..160].iter_mut() {
            *bit ^= 1;
        }
        frame[170] ^= 1;
        frame[200] ^= 1;

        let output = lower_mac.process(&frame, BurstType::Sdb, None);
        assert!(output.decode_error);
        assert!(matches!(output.cell_lock, CellLockUpdate::Lose));
    }

    #[test]
    fn normal_downlink_burst_control_channel() {
        let lower_mac = LowerMac::new();
        let mut scrambler = ScramblerCache::new();
        let sync = BroadcastSynchronizationChannel::with_scrambling_code(TEST_SCRAMBLING_CODE);

        let mut frame = vec![0u8; 510];
        // AACH: header 0b00 -> common control
        let aach = encode_aach(&mut scrambler, 0, TEST_SCRAMBLING_CODE);
        for (i, &bit) in aach.iter().enumerate() {
            let offset = if i >= 14 { 252 } else { 230 };
            frame[offset + i] = bit;
        }
        // SCH/F block with a non-trivial payload
        let type1: Vec<u8> = (0..SCH_F_PARAMS.type1_bits)
            .map(|i| ((i * 3 + 1) % 7 < 3) as u8)
            .collect();
        let bkn1 = encode_cp(&mut scrambler, &SCH_F_PARAMS, &type1, TEST_SCRAMBLING_CODE);
        for (i, &bit) in bkn1.iter().enumerate() {
            let offset = if i >= 216 { 66 } else { 14 };
            frame[offset + i] = bit;
        }

        let output = lower_mac.process(&frame, BurstType::Ndb, Some(&sync));
        assert!(!output.decode_error);
        let slots = output.slots.unwrap();
        let slot = slots.first_slot().data();
        assert_eq!(slot.channel, LogicalChannel::SchF);
        assert!(slot.crc_ok);
        assert_eq!(slot.data.to_bitstr(), BitBuffer::from_bits(&type1).to_bitstr());
    }

    #[test]
    fn control_uplink_burst_decodes_sch_hu() {
        let lower_mac = LowerMac::new();
        let mut scrambler = ScramblerCache::new();
        let sync = BroadcastSynchronizationChannel::with_scrambling_code(TEST_SCRAMBLING_CODE);

        let type1: Vec<u8> = (0..SCH_HU_PARAMS.type1_bits)
            .map(|i| ((i * 11 + 2) % 4 < 2) as u8)
            .collect();
        let cb = encode_cp(&mut scrambler, &SCH_HU_PARAMS, &type1, TEST_SCRAMBLING_CODE);

        let mut frame = vec![0u8; 510];
        for (i, &bit) in cb.iter().enumerate() {
            let offset = if i >= 84 { 34 } else { 4 };
            frame[offset + i] = bit;
        }

        let output = lower_mac.process(&frame, BurstType::Cub, Some(&sync));
        assert!(!output.decode_error);
        let slots = output.slots.unwrap();
        let slot = slots.first_slot().data();
        assert_eq!(slot.channel, LogicalChannel::SchHu);
        assert!(slot.crc_ok);
        assert_eq!(slot.data.get_len(), 92);
    }

    #[test]
    fn normal_uplink_burst_defaults_to_signalling() {
        let lower_mac = LowerMac::new();
        let mut scrambler = ScramblerCache::new();
        let sync = BroadcastSynchronizationChannel::with_scrambling_code(TEST_SCRAMBLING_CODE);

        let type1: Vec<u8> = (0..SCH_F_PARAMS.type1_bits)
            .map(|i| ((i * 7 + 5) % 9 < 4) as u8)
            .collect();
        let bkn1 = encode_cp(&mut scrambler, &SCH_F_PARAMS, &type1, TEST_SCRAMBLING_CODE);

        let mut frame = vec![0u8; 510];
        for (i, &bit) in bkn1.iter().enumerate() {
            let offset = if i >= 216 { 26 } else { 4 };
            frame[offset + i] = bit;
        }

        let output = lower_mac.process(&frame, BurstType::Nub, Some(&sync));
        let slots = output.slots.unwrap();
        let slot = slots.first_slot().data();
        assert_eq!(slot.channel, LogicalChannel::SchF);
        assert!(slot.crc_ok);
    }
}

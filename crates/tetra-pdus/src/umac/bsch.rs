use tetra_core::{BitBuffer, PduParseErr, TdmaTime};

/// Broadcast Synchronization Channel, sent in the SB subfield of every
/// synchronization burst (Clause 21.4.4.2 and 18.4.2.1 D-MLE-SYNC).
///
/// One instance per cell lock; replaced on re-sync. The derived scrambling
/// code descrambles every subsequent burst from this cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastSynchronizationChannel {
    pub system_code: u8,
    pub color_code: u8,
    pub time: TdmaTime,
    pub sharing_mode: u8,
    pub time_slot_reserved_frames: u8,
    pub up_lane_dtx: u8,
    pub frame_18_extension: u8,

    pub mobile_country_code: u16,
    pub mobile_network_code: u16,
    pub neighbour_broadcast_supported: u8,
    pub neighbour_enquiry_supported: u8,
    pub cell_load_ca: u8,
    pub late_entry_supported: u8,

    /// 32-bit LFSR seed derived from colour code, MNC and MCC.
    pub scrambling_code: u32,
}

impl BroadcastSynchronizationChannel {
    /// Synthetic cell state for uplink-only operation with an injected
    /// scrambling code and no decoded SB.
    pub fn with_scrambling_code(scrambling_code: u32) -> Self {
        BroadcastSynchronizationChannel {
            system_code: 0,
            color_code: 0,
            time: TdmaTime::default(),
            sharing_mode: 0,
            time_slot_reserved_frames: 0,
            up_lane_dtx: 0,
            frame_18_extension: 0,
            mobile_country_code: 0,
            mobile_network_code: 0,
            neighbour_broadcast_supported: 0,
            neighbour_enquiry_supported: 0,
            cell_load_ca: 0,
            late_entry_supported: 0,
            scrambling_code,
        }
    }

    /// Parse the 60 type-1 bits of a decoded SB block.
    pub fn from_buf(buf: &mut BitBuffer) -> Result<Self, PduParseErr> {
        let system_code = buf.read_field(4, "system_code")? as u8;
        let color_code = buf.read_field(6, "color_code")? as u8;
        let time_slot = buf.read_field(2, "time_slot")? as u8 + 1;
        let frame_number = buf.read_field(5, "frame_number")? as u8;
        let multi_frame_number = buf.read_field(6, "multi_frame_number")? as u8;
        let sharing_mode = buf.read_field(2, "sharing_mode")? as u8;
        let time_slot_reserved_frames = buf.read_field(3, "ts_reserved_frames")? as u8;
        let up_lane_dtx = buf.read_field(1, "up_lane_dtx")? as u8;
        let frame_18_extension = buf.read_field(1, "frame_18_extension")? as u8;
        let _reserved = buf.read_field(1, "reserved")?;

        let mobile_country_code = buf.read_field(10, "mcc")? as u16;
        let mobile_network_code = buf.read_field(14, "mnc")? as u16;
        let neighbour_broadcast_supported = buf.read_field(1, "broadcast_supported")? as u8;
        let neighbour_enquiry_supported = buf.read_field(1, "enquiry_supported")? as u8;
        let cell_load_ca = buf.read_field(2, "cell_load_ca")? as u8;
        let late_entry_supported = buf.read_field(1, "late_entry_supported")? as u8;

        // 30 MSB: colour code in the low 6, MNC above it, MCC on top;
        // bits 31..32 initialized to 1 - Clause 8.2.5.2 (54)
        let scrambling_code = (((color_code as u32 & 0x3f)
            | ((mobile_network_code as u32 & 0x3fff) << 6)
            | ((mobile_country_code as u32 & 0x3ff) << 20))
            << 2)
            | 0b11;

        Ok(BroadcastSynchronizationChannel {
            system_code,
            color_code,
            time: TdmaTime::new(time_slot, frame_number, multi_frame_number),
            sharing_mode,
            time_slot_reserved_frames,
            up_lane_dtx,
            frame_18_extension,
            mobile_country_code,
            mobile_network_code,
            neighbour_broadcast_supported,
            neighbour_enquiry_supported,
            cell_load_ca,
            late_entry_supported,
            scrambling_code,
        })
    }
}

impl core::fmt::Display for BroadcastSynchronizationChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "BSCH {{ cc: {}, mcc: {}, mnc: {}, time: {}, scrambling_code: {:#010x} }}",
            self.color_code,
            self.mobile_country_code,
            self.mobile_network_code,
            self.time,
            self.scrambling_code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_bsch(
        system_code: u8,
        color_code: u8,
        ts: u8,
        frame: u8,
        multiframe: u8,
        mcc: u16,
        mnc: u16,
    ) -> BitBuffer {
        let mut buf = BitBuffer::new(60);
        buf.write_bits(system_code as u64, 4);
        buf.write_bits(color_code as u64, 6);
        buf.write_bits(ts as u64 - 1, 2);
        buf.write_bits(frame as u64, 5);
        buf.write_bits(multiframe as u64, 6);
        buf.write_bits(0, 2); // sharing mode
        buf.write_bits(0, 3); // reserved frames
        buf.write_bits(0, 1); // up lane dtx
        buf.write_bits(0, 1); // frame 18 extension
        buf.write_bits(0, 1); // reserved
        buf.write_bits(mcc as u64, 10);
        buf.write_bits(mnc as u64, 14);
        buf.write_bits(0, 1);
        buf.write_bits(0, 1);
        buf.write_bits(0, 2);
        buf.write_bits(0, 1);
        buf.seek(0);
        buf
    }

    #[test]
    fn scrambling_code_derivation() {
        let mut buf = encode_bsch(0b1001, 7, 1, 1, 1, 262, 16383);
        let bsch = BroadcastSynchronizationChannel::from_buf(&mut buf).unwrap();
        assert_eq!(bsch.system_code, 0b1001);
        assert_eq!(bsch.color_code, 7);
        assert_eq!(bsch.time, TdmaTime::new(1, 1, 1));
        assert_eq!(bsch.mobile_country_code, 262);
        assert_eq!(bsch.mobile_network_code, 16383);
        assert_eq!(
            bsch.scrambling_code,
            ((7u32 | (16383 << 6) | (262 << 20)) << 2) | 0b11
        );
        assert_eq!(bsch.scrambling_code, 0x41BFFF1F);
    }

    #[test]
    fn bsch_seed_for_bsch_itself_is_three() {
        // colour code 0 with zero MNI keeps only the fixed 0b11 tail, the
        // seed every SB block is scrambled with
        let mut buf = encode_bsch(0, 0, 2, 18, 60, 0, 0);
        let bsch = BroadcastSynchronizationChannel::from_buf(&mut buf).unwrap();
        assert_eq!(bsch.scrambling_code, 0x3);
        assert_eq!(bsch.time, TdmaTime::new(2, 18, 60));
    }
}

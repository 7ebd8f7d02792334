use tetra_core::{BitBuffer, BurstType, PduParseErr, TdmaTime};

/// What the downlink slot carries according to the AACH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownlinkUsage {
    CommonControl,
    Unallocated,
    AssignedControl,
    CommonAndAssignedControl,
    Traffic,
}

impl DownlinkUsage {
    pub fn discriminant(self) -> u8 {
        match self {
            DownlinkUsage::CommonControl => 0,
            DownlinkUsage::Unallocated => 1,
            DownlinkUsage::AssignedControl => 2,
            DownlinkUsage::CommonAndAssignedControl => 3,
            DownlinkUsage::Traffic => 4,
        }
    }
}

/// Access Assignment Channel: the 14 type-1 bits of the Reed-Muller-coded
/// broadcast block carried in every downlink burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessAssignmentChannel {
    pub downlink_usage: DownlinkUsage,
    pub downlink_traffic_usage_marker: Option<u8>,
}

impl AccessAssignmentChannel {
    pub fn from_buf(
        burst_type: BurstType,
        time: TdmaTime,
        buf: &mut BitBuffer,
    ) -> Result<Self, PduParseErr> {
        if !burst_type.is_downlink() {
            return Err(PduParseErr::Unexpected { field: "aach on uplink burst" });
        }

        let header = buf.read_field(2, "header")?;
        let field1 = buf.read_field(6, "field1")? as u8;
        let _field2 = buf.read_field(6, "field2")?;

        // Frame 18 is always common control regardless of the field contents
        let (downlink_usage, marker) = if time.f == 18 || header == 0b00 {
            (DownlinkUsage::CommonControl, None)
        } else {
            match field1 {
                0b000000 => (DownlinkUsage::Unallocated, None),
                0b000001 => (DownlinkUsage::AssignedControl, None),
                0b000010 => (DownlinkUsage::CommonControl, None),
                0b000011 => (DownlinkUsage::CommonAndAssignedControl, None),
                marker => (DownlinkUsage::Traffic, Some(marker)),
            }
        };

        Ok(AccessAssignmentChannel {
            downlink_usage,
            downlink_traffic_usage_marker: marker,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aach_bits(header: u8, field1: u8, field2: u8) -> BitBuffer {
        let mut buf = BitBuffer::new(14);
        buf.write_bits(header as u64, 2);
        buf.write_bits(field1 as u64, 6);
        buf.write_bits(field2 as u64, 6);
        buf.seek(0);
        buf
    }

    #[test]
    fn traffic_marker_mapping() {
        let mut buf = aach_bits(0b01, 0b000101, 0);
        let aach =
            AccessAssignmentChannel::from_buf(BurstType::Ndb, TdmaTime::new(1, 3, 1), &mut buf)
                .unwrap();
        assert_eq!(aach.downlink_usage, DownlinkUsage::Traffic);
        assert_eq!(aach.downlink_traffic_usage_marker, Some(0b000101));
    }

    #[test]
    fn frame18_forces_common_control() {
        let mut buf = aach_bits(0b01, 0b000101, 0);
        let aach =
            AccessAssignmentChannel::from_buf(BurstType::Ndb, TdmaTime::new(1, 18, 1), &mut buf)
                .unwrap();
        assert_eq!(aach.downlink_usage, DownlinkUsage::CommonControl);
        assert_eq!(aach.downlink_traffic_usage_marker, None);
    }

    #[test]
    fn control_field_values() {
        for (field1, expected) in [
            (0b000000, DownlinkUsage::Unallocated),
            (0b000001, DownlinkUsage::AssignedControl),
            (0b000010, DownlinkUsage::CommonControl),
            (0b000011, DownlinkUsage::CommonAndAssignedControl),
        ] {
            let mut buf = aach_bits(0b10, field1, 0);
            let aach = AccessAssignmentChannel::from_buf(
                BurstType::NdbSplit,
                TdmaTime::new(2, 5, 1),
                &mut buf,
            )
            .unwrap();
            assert_eq!(aach.downlink_usage, expected);
        }
    }

    #[test]
    fn rejected_on_uplink() {
        let mut buf = aach_bits(0, 0, 0);
        assert!(
            AccessAssignmentChannel::from_buf(BurstType::Nub, TdmaTime::default(), &mut buf)
                .is_err()
        );
    }
}

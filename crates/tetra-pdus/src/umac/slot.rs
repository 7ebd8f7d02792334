use tetra_core::{BitBuffer, BurstType, LogicalChannel, LogicalChannelDataAndCrc, PduParseErr};

/// A half or full slot with its decoded content. Freshly decoded subslots
/// may carry more than one candidate logical channel; construction of the
/// enclosing [`Slots`] resolves the ambiguity, and afterwards every slot is
/// concrete.
#[derive(Debug, Clone)]
pub struct Slot {
    candidates: Vec<LogicalChannelDataAndCrc>,
}

impl Slot {
    /// A slot with an already-determined logical channel.
    pub fn single(data: LogicalChannelDataAndCrc) -> Self {
        Slot { candidates: vec![data] }
    }

    /// A slot whose logical channel is one of several candidates.
    /// Candidate channels must be distinct.
    pub fn ambiguous(candidates: Vec<LogicalChannelDataAndCrc>) -> Result<Self, PduParseErr> {
        assert!(!candidates.is_empty(), "a slot needs at least one candidate");
        for (i, a) in candidates.iter().enumerate() {
            for b in candidates.iter().skip(i + 1) {
                if a.channel == b.channel {
                    return Err(PduParseErr::Unexpected { field: "duplicate channel in slot" });
                }
            }
        }
        Ok(Slot { candidates })
    }

    /// A slot is concrete iff exactly one candidate remains.
    pub fn is_concrete(&self) -> bool {
        self.candidates.len() == 1
    }

    /// The concrete channel, data and CRC verdict.
    pub fn data(&self) -> &LogicalChannelDataAndCrc {
        assert!(self.is_concrete(), "slot is not concrete");
        &self.candidates[0]
    }

    /// Make the slot concrete by picking one candidate channel.
    fn select_logical_channel(&mut self, channel: LogicalChannel) -> Result<(), PduParseErr> {
        self.candidates.retain(|c| c.channel == channel);
        if !self.is_concrete() {
            return Err(PduParseErr::Unexpected { field: "selected channel not available" });
        }
        Ok(())
    }
}

/// Number and kind of slots decoded from one burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotsType {
    OneSubslot,
    TwoSubslots,
    FullSlot,
}

/// The slots of one decoded burst, all concrete after construction.
#[derive(Debug, Clone)]
pub struct Slots {
    burst_type: BurstType,
    slots_type: SlotsType,
    slots: Vec<Slot>,
}

impl Slots {
    /// Build from a single subslot or full slot.
    ///
    /// A `NormalUplinkBurst` full slot is ambiguous between full signalling
    /// and traffic; without the corresponding downlink access assignment we
    /// default to signalling.
    pub fn new(burst_type: BurstType, slots_type: SlotsType, slot: Slot) -> Result<Self, PduParseErr> {
        if slots_type == SlotsType::TwoSubslots {
            return Err(PduParseErr::Unexpected { field: "two subslots need two slots" });
        }

        let mut slots = Slots { burst_type, slots_type, slots: vec![slot] };

        if burst_type == BurstType::Nub {
            slots.slots[0].select_logical_channel(LogicalChannel::SchF)?;
        }

        if !slots.slots[0].is_concrete() {
            return Err(PduParseErr::Unexpected { field: "first slot not concrete" });
        }
        Ok(slots)
    }

    /// Build from two half slots.
    ///
    /// When the first subslot is stolen, the second is stolen as well iff
    /// the first subslot's MAC-DATA or MAC-RESOURCE length indication is
    /// 0b111110/0b111111, or its MAC-U-SIGNAL declares the second half slot
    /// stolen; otherwise it is traffic.
    pub fn new_split(
        burst_type: BurstType,
        slots_type: SlotsType,
        first: Slot,
        second: Slot,
    ) -> Result<Self, PduParseErr> {
        if slots_type != SlotsType::TwoSubslots {
            return Err(PduParseErr::Unexpected { field: "split slots must be two subslots" });
        }

        let mut slots = Slots { burst_type, slots_type, slots: vec![first, second] };

        if !slots.slots[0].is_concrete() {
            return Err(PduParseErr::Unexpected { field: "first subslot not concrete" });
        }

        if slots.slots[0].data().channel == LogicalChannel::Stch {
            let first_data = &slots.slots[0].data().data;
            let second_stolen = match burst_type {
                BurstType::NubSplit => second_subslot_stolen_uplink(first_data),
                BurstType::NdbSplit => second_subslot_stolen_downlink(first_data),
                _ => false,
            };
            slots.slots[1].select_logical_channel(if second_stolen {
                LogicalChannel::Stch
            } else {
                LogicalChannel::Tch
            })?;
        }

        if !slots.slots[1].is_concrete() {
            return Err(PduParseErr::Unexpected { field: "second subslot not concrete" });
        }
        Ok(slots)
    }

    pub fn burst_type(&self) -> BurstType {
        self.burst_type
    }

    pub fn slots_type(&self) -> SlotsType {
        self.slots_type
    }

    pub fn first_slot(&self) -> &Slot {
        &self.slots[0]
    }

    pub fn second_slot(&self) -> Option<&Slot> {
        self.slots.get(1)
    }

    pub fn has_second_slot(&self) -> bool {
        self.slots.len() == 2
    }

    /// Iterate the concrete per-slot channel data.
    pub fn concrete_slots(&self) -> impl Iterator<Item = &LogicalChannelDataAndCrc> {
        self.slots.iter().map(|s| s.data())
    }

    /// True if any signalling or stealing slot failed its CRC.
    pub fn has_crc_error(&self) -> bool {
        self.concrete_slots()
            .any(|slot| slot.channel != LogicalChannel::Tch && !slot.crc_ok)
    }
}

/// Stolen flag of the first subslot on the uplink: MAC-DATA length
/// indication or MAC-U-SIGNAL flag (Clauses 21.4.2.3 and 21.4.5).
fn second_subslot_stolen_uplink(data: &BitBuffer) -> bool {
    match data.peek_bits_startoffset(0, 2) {
        Some(0b00) => {
            // MAC-DATA: pdu type, fill bits, encrypted, then the address
            let Some(address_type) = data.peek_bits_startoffset(4, 2) else {
                return false;
            };
            let li_offset = 6 + if address_type == 0b01 { 10 } else { 24 };
            if data.peek_bits_startoffset(li_offset, 1) == Some(0b0) {
                matches!(
                    data.peek_bits_startoffset(li_offset + 1, 6),
                    Some(0b111110) | Some(0b111111)
                )
            } else {
                false
            }
        }
        Some(0b11) => data.peek_bits_startoffset(2, 1) == Some(1),
        _ => false,
    }
}

/// Stolen flag of the first subslot on the downlink: MAC-RESOURCE length
/// indication or MAC-U-SIGNAL flag (Clauses 21.4.3.1 and 21.4.5).
fn second_subslot_stolen_downlink(data: &BitBuffer) -> bool {
    match data.peek_bits_startoffset(0, 2) {
        Some(0b00) => matches!(
            data.peek_bits_startoffset(7, 6),
            Some(0b111110) | Some(0b111111)
        ),
        Some(0b11) => data.peek_bits_startoffset(2, 1) == Some(1),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_data(channel: LogicalChannel, bits: &str) -> LogicalChannelDataAndCrc {
        LogicalChannelDataAndCrc {
            channel,
            data: BitBuffer::from_bitstr(bits),
            crc_ok: true,
        }
    }

    #[test]
    fn nub_full_slot_defaults_to_signalling() {
        let slot = Slot::ambiguous(vec![
            channel_data(LogicalChannel::SchF, "0000"),
            channel_data(LogicalChannel::Tch, "0000"),
        ])
        .unwrap();
        let slots = Slots::new(BurstType::Nub, SlotsType::FullSlot, slot).unwrap();
        assert_eq!(slots.first_slot().data().channel, LogicalChannel::SchF);
    }

    #[test]
    fn downlink_split_second_subslot_stolen_via_length_indication() {
        // MAC-RESOURCE header with length indication 0b111110 at offset 7
        let mut first_bits = String::from("00"); // pdu type
        first_bits.push_str("0"); // fill bits
        first_bits.push_str("0"); // position of grant
        first_bits.push_str("00"); // encryption
        first_bits.push_str("0"); // random access
        first_bits.push_str("111110"); // length indication: second half slot stolen
        first_bits.push_str("000000000000");

        let first = Slot::single(channel_data(LogicalChannel::Stch, &first_bits));
        let second = Slot::ambiguous(vec![
            channel_data(LogicalChannel::Stch, "0000"),
            channel_data(LogicalChannel::Tch, "0000"),
        ])
        .unwrap();

        let slots =
            Slots::new_split(BurstType::NdbSplit, SlotsType::TwoSubslots, first, second).unwrap();
        assert_eq!(slots.second_slot().unwrap().data().channel, LogicalChannel::Stch);
    }

    #[test]
    fn downlink_split_second_subslot_traffic_otherwise() {
        let mut first_bits = String::from("00");
        first_bits.push_str("0");
        first_bits.push_str("0");
        first_bits.push_str("00");
        first_bits.push_str("0");
        first_bits.push_str("000011"); // plain length indication
        first_bits.push_str("000000000000");

        let first = Slot::single(channel_data(LogicalChannel::Stch, &first_bits));
        let second = Slot::ambiguous(vec![
            channel_data(LogicalChannel::Stch, "0000"),
            channel_data(LogicalChannel::Tch, "0000"),
        ])
        .unwrap();

        let slots =
            Slots::new_split(BurstType::NdbSplit, SlotsType::TwoSubslots, first, second).unwrap();
        assert_eq!(slots.second_slot().unwrap().data().channel, LogicalChannel::Tch);
    }

    #[test]
    fn u_signal_steals_second_subslot() {
        // MAC-U-SIGNAL with the second-slot-stolen flag set
        let first = Slot::single(channel_data(LogicalChannel::Stch, "111000000000"));
        let second = Slot::ambiguous(vec![
            channel_data(LogicalChannel::Stch, "0000"),
            channel_data(LogicalChannel::Tch, "0000"),
        ])
        .unwrap();

        let slots =
            Slots::new_split(BurstType::NubSplit, SlotsType::TwoSubslots, first, second).unwrap();
        assert_eq!(slots.second_slot().unwrap().data().channel, LogicalChannel::Stch);
    }

    #[test]
    fn duplicate_candidate_channels_rejected() {
        assert!(
            Slot::ambiguous(vec![
                channel_data(LogicalChannel::Tch, "0"),
                channel_data(LogicalChannel::Tch, "1"),
            ])
            .is_err()
        );
    }

    #[test]
    fn crc_error_ignores_traffic() {
        let mut signalling = channel_data(LogicalChannel::SchHd, "0000");
        signalling.crc_ok = false;
        let slots =
            Slots::new(BurstType::Ndb, SlotsType::OneSubslot, Slot::single(signalling)).unwrap();
        assert!(slots.has_crc_error());

        let mut traffic = channel_data(LogicalChannel::Tch, "0000");
        traffic.crc_ok = true;
        let slots =
            Slots::new(BurstType::Ndb, SlotsType::FullSlot, Slot::single(traffic)).unwrap();
        assert!(!slots.has_crc_error());
    }
}

//! Per-slot decoding of upper MAC PDUs.
//!
//! Operates on a fresh bit cursor over a concrete slot's payload and emits
//! the MAC packets it contains. All state (fragmentation, timebase, cell
//! lock) stays with the caller.

use tetra_core::{
    Address, BitBuffer, BurstType, Direction, LogicalChannel, LogicalChannelDataAndCrc,
    PduParseErr,
};

use crate::umac::fields::{AccessDefine, ChannelAllocationElement, SystemInfo};
use crate::umac::packet::{
    LengthIndication, MacPacketType, UpperMacBroadcastPacket, UpperMacCPlaneSignallingPacket,
    UpperMacPackets, UpperMacUPlaneSignallingPacket, UpperMacUPlaneTrafficPacket,
};
use crate::umac::slot::Slots;

/// Parse every concrete slot of a burst into one packet bundle.
pub fn parse_slots(slots: &Slots) -> Result<UpperMacPackets, PduParseErr> {
    let mut packets = parse_logical_channel(slots.burst_type(), slots.first_slot().data())?;
    if let Some(second) = slots.second_slot() {
        packets.merge(parse_logical_channel(slots.burst_type(), second.data())?)?;
    }
    Ok(packets)
}

/// Parse one concrete logical channel block.
pub fn parse_logical_channel(
    burst_type: BurstType,
    slot: &LogicalChannelDataAndCrc,
) -> Result<UpperMacPackets, PduParseErr> {
    let channel = slot.channel;
    let mut data = slot.data.clone();
    data.seek(0);

    if channel == LogicalChannel::Tch {
        return Ok(UpperMacPackets {
            u_plane_traffic_packet: Some(UpperMacUPlaneTrafficPacket { logical_channel: channel, data }),
            ..UpperMacPackets::default()
        });
    }

    // policy: corrupt signalling is not parsed
    if !slot.crc_ok {
        return Ok(UpperMacPackets::default());
    }

    let pdu_type = data.peek_bits(2).ok_or(PduParseErr::BufferEnded { field: Some("pdu_type") })?;

    // Table 21.38: on the stealing channel pdu type 0b11 selects
    // MAC-U-SIGNAL, everything else stays C-plane
    if channel == LogicalChannel::Stch {
        if pdu_type == 0b11 {
            return Ok(UpperMacPackets {
                u_plane_signalling_packets: vec![parse_u_plane_signalling(channel, data)?],
                ..UpperMacPackets::default()
            });
        }
        return Ok(UpperMacPackets {
            c_plane_signalling_packets: parse_c_plane_signalling(burst_type, channel, data)?,
            ..UpperMacPackets::default()
        });
    }

    if pdu_type == 0b10 {
        // TMB-SAP broadcast, downlink only
        if !burst_type.is_downlink() {
            return Err(PduParseErr::Unexpected { field: "broadcast on uplink burst" });
        }
        return Ok(UpperMacPackets {
            broadcast_packet: Some(parse_broadcast(channel, data)?),
            ..UpperMacPackets::default()
        });
    }

    Ok(UpperMacPackets {
        c_plane_signalling_packets: parse_c_plane_signalling(burst_type, channel, data)?,
        ..UpperMacPackets::default()
    })
}

fn parse_broadcast(
    channel: LogicalChannel,
    mut data: BitBuffer,
) -> Result<UpperMacBroadcastPacket, PduParseErr> {
    let mut packet = UpperMacBroadcastPacket {
        logical_channel: channel,
        ptype: MacPacketType::MacBroadcast,
        sysinfo: None,
        access_define: None,
    };

    let _pdu_type = data.read_field(2, "pdu_type")?;
    match data.read_field(2, "broadcast_type")? {
        0b00 => packet.sysinfo = Some(SystemInfo::from_buf(&mut data)?),
        0b01 => packet.access_define = Some(AccessDefine::from_buf(&mut data)?),
        0b10 => return Err(PduParseErr::NotImplemented { field: Some("SYSINFO-DA") }),
        _ => return Err(PduParseErr::InvalidValue { field: "broadcast_type", value: 0b11 }),
    }

    if data.bits_left() != 0 {
        return Err(PduParseErr::InconsistentLength { expected: 0, found: data.bits_left() });
    }

    Ok(packet)
}

/// Decode C-plane PDUs one at a time until the block is exhausted.
///
/// 23.4.3.3 PDU dissociation: when the remaining size is below the size of
/// the appropriate null PDU (16 bits downlink, 36 bits uplink subslot, 37
/// bits uplink full slot or STCH) the remaining bits are discarded. MAC
/// padding and the null PDU terminate the block early.
fn parse_c_plane_signalling(
    burst_type: BurstType,
    channel: LogicalChannel,
    mut data: BitBuffer,
) -> Result<Vec<UpperMacCPlaneSignallingPacket>, PduParseErr> {
    let min_bit_count = if burst_type.is_downlink() {
        16
    } else if channel == LogicalChannel::SchHu {
        36
    } else {
        37
    };

    let mut packets = Vec::new();
    while data.bits_left() >= min_bit_count {
        if data.is_mac_padding() {
            tracing::trace!("found mac padding, stopping: {}", data.dump_bin());
            break;
        }
        let packet = parse_c_plane_signalling_packet(burst_type, channel, &mut data)?;
        let stop = packet.is_null_pdu();
        packets.push(packet);
        if stop {
            break;
        }
    }
    Ok(packets)
}

fn parse_c_plane_signalling_packet(
    burst_type: BurstType,
    channel: LogicalChannel,
    data: &mut BitBuffer,
) -> Result<UpperMacCPlaneSignallingPacket, PduParseErr> {
    let direction = if burst_type.is_downlink() { Direction::Dl } else { Direction::Ul };

    if channel == LogicalChannel::SchHu {
        if burst_type.is_downlink() {
            return Err(PduParseErr::Unexpected { field: "SCH/HU on downlink burst" });
        }
        return parse_sch_hu_packet(channel, data);
    }

    if burst_type.is_uplink() {
        parse_uplink_packet(channel, direction, data)
    } else {
        parse_downlink_packet(channel, direction, data)
    }
}

/// MAC-ACCESS and MAC-END-HU, the two PDUs of the SCH/HU (Clause 21.4.1).
fn parse_sch_hu_packet(
    channel: LogicalChannel,
    data: &mut BitBuffer,
) -> Result<UpperMacCPlaneSignallingPacket, PduParseErr> {
    let preprocessing_bit_count = data.bits_left();

    let pdu_type = data.read_field(1, "pdu_type")?;
    let fill_bit_indication = data.read_field(1, "fill_bit_indication")?;

    if pdu_type == 0b0 {
        // MAC-ACCESS
        let mut packet =
            UpperMacCPlaneSignallingPacket::new(channel, Direction::Ul, MacPacketType::MacAccess);

        packet.encrypted = data.read_field(1, "encrypted")? == 1;
        packet.address = Address::from_mac_access(data)?;

        let mut length_indication = None;
        if data.read_field(1, "optional_field_flag")? == 0b1 {
            if data.read_field(1, "length_indication_or_capacity_request")? == 0b0 {
                length_indication = Some(data.read_field(5, "length_indication")? as u8);
            } else {
                packet.fragmentation = data.read_field(1, "fragmentation")? == 1;
                packet.reservation_requirement =
                    Some(data.read_field(4, "reservation_requirement")? as u8);
            }
        }

        let mac_header_length = preprocessing_bit_count - data.bits_left();
        if fill_bit_indication == 0b1 {
            data.remove_fill_bits();
        }

        let sdu_bits = match length_indication {
            Some(0) => 0,
            Some(li) => capped_sdu_bits(
                LengthIndication::from_mac_access(li),
                mac_header_length,
                fill_bit_indication == 0b1,
                data,
            )?,
            None => data.bits_left(),
        };
        if sdu_bits != 0 {
            packet.tm_sdu = Some(data.take_vector(sdu_bits)?);
        }

        return Ok(packet);
    }

    // MAC-END-HU
    let mut packet =
        UpperMacCPlaneSignallingPacket::new(channel, Direction::Ul, MacPacketType::MacEndHu);

    let mut length_indication = None;
    if data.read_field(1, "length_indication_or_capacity_request")? == 0b0 {
        length_indication = Some(data.read_field(4, "length_indication")? as u8);
    } else {
        packet.reservation_requirement = Some(data.read_field(4, "reservation_requirement")? as u8);
    }

    let mac_header_length = preprocessing_bit_count - data.bits_left();
    let sdu_bits = match length_indication {
        Some(li) => capped_sdu_bits(
            LengthIndication::from_mac_end_hu(li),
            mac_header_length,
            fill_bit_indication == 0b1,
            data,
        )?,
        None => data.bits_left(),
    };
    packet.tm_sdu = Some(data.take_vector(sdu_bits)?);

    Ok(packet)
}

/// SCH/F and STCH PDUs of the uplink (Clause 21.4.2).
fn parse_uplink_packet(
    channel: LogicalChannel,
    direction: Direction,
    data: &mut BitBuffer,
) -> Result<UpperMacCPlaneSignallingPacket, PduParseErr> {
    let preprocessing_bit_count = data.bits_left();
    let pdu_type = data.read_field(2, "pdu_type")?;

    match pdu_type {
        0b00 => {
            // MAC-DATA
            let mut packet =
                UpperMacCPlaneSignallingPacket::new(channel, direction, MacPacketType::MacData);

            let fill_bit_indication = data.read_field(1, "fill_bit_indication")?;
            packet.encrypted = data.read_field(1, "encrypted")? == 1;
            packet.address = Address::from_mac_data(data)?;

            let mut length_indication = None;
            if data.read_field(1, "length_indication_or_capacity_request")? == 0b0 {
                let li = data.read_field(6, "length_indication")? as u8;
                if li == 0b111111 {
                    packet.fragmentation_on_stealing_channel = true;
                }
                length_indication = Some(li);
            } else {
                packet.fragmentation = data.read_field(1, "fragmentation")? == 1;
                packet.reservation_requirement =
                    Some(data.read_field(4, "reservation_requirement")? as u8);
                let _reserved = data.read_field(1, "reserved")?;
            }

            let mac_header_length = preprocessing_bit_count - data.bits_left();
            if fill_bit_indication == 0b1 {
                data.remove_fill_bits();
            }

            let sdu_bits = match length_indication {
                Some(0) => 0,
                Some(0b111110) | Some(0b111111) => data.bits_left(),
                Some(li) => capped_sdu_bits(
                    LengthIndication::from_mac_data(li),
                    mac_header_length,
                    fill_bit_indication == 0b1,
                    data,
                )?,
                None => data.bits_left(),
            };
            if sdu_bits != 0 {
                packet.tm_sdu = Some(data.take_vector(sdu_bits)?);
            }

            Ok(packet)
        }
        0b01 => {
            // MAC-FRAG or MAC-END
            if data.read_field(1, "subtype")? == 0b0 {
                if channel == LogicalChannel::Stch {
                    return Err(PduParseErr::Unexpected { field: "MAC-FRAG on stealing channel" });
                }
                let mut packet = UpperMacCPlaneSignallingPacket::new(
                    channel,
                    direction,
                    MacPacketType::MacFragmentUplink,
                );
                if data.read_field(1, "fill_bit_indication")? == 0b1 {
                    data.remove_fill_bits();
                }
                packet.tm_sdu = Some(data.take_vector(data.bits_left())?);
                return Ok(packet);
            }

            let mut packet = UpperMacCPlaneSignallingPacket::new(
                channel,
                direction,
                MacPacketType::MacEndUplink,
            );
            let fill_bit_indication = data.read_field(1, "fill_bit_indication")?;
            let li_or_reservation = data.read_field(6, "length_indication_or_reservation")? as u8;

            let mac_header_length = preprocessing_bit_count - data.bits_left();
            if fill_bit_indication == 0b1 {
                data.remove_fill_bits();
            }

            let sdu_bits = if li_or_reservation >= 0b110000 {
                packet.reservation_requirement = Some(li_or_reservation & 0x0f);
                data.bits_left()
            } else {
                capped_sdu_bits(
                    LengthIndication::from_mac_end_uplink(li_or_reservation),
                    mac_header_length,
                    fill_bit_indication == 0b1,
                    data,
                )?
            };
            packet.tm_sdu = Some(data.take_vector(sdu_bits)?);

            Ok(packet)
        }
        0b10 => Err(PduParseErr::Unexpected { field: "broadcast in c-plane parser" }),
        _ => {
            // Supplementary MAC PDU
            if data.read_field(1, "subtype")? == 0b1 {
                return Err(PduParseErr::InvalidValue { field: "supplementary_subtype", value: 1 });
            }
            if channel != LogicalChannel::SchF {
                return Err(PduParseErr::Unexpected { field: "MAC-U-BLCK outside SCH/F" });
            }

            let mut packet =
                UpperMacCPlaneSignallingPacket::new(channel, direction, MacPacketType::MacUBlck);
            if data.read_field(1, "fill_bit_indication")? == 0b1 {
                data.remove_fill_bits();
            }
            packet.encrypted = data.read_field(1, "encrypted")? == 1;
            packet.address.event_label = Some(data.read_field(10, "event_label")? as u16);
            packet.reservation_requirement =
                Some(data.read_field(4, "reservation_requirement")? as u8);

            Ok(packet)
        }
    }
}

/// SCH/F, SCH/HD and STCH PDUs of the downlink (Clause 21.4.3).
fn parse_downlink_packet(
    channel: LogicalChannel,
    direction: Direction,
    data: &mut BitBuffer,
) -> Result<UpperMacCPlaneSignallingPacket, PduParseErr> {
    let preprocessing_bit_count = data.bits_left();
    let pdu_type = data.read_field(2, "pdu_type")?;

    match pdu_type {
        0b00 => {
            // MAC-RESOURCE
            let mut packet =
                UpperMacCPlaneSignallingPacket::new(channel, direction, MacPacketType::MacResource);

            let fill_bit_indication = data.read_field(1, "fill_bit_indication")?;
            packet.position_of_grant = Some(data.read_field(1, "position_of_grant")? as u8);

            let encryption_mode = data.read_field(2, "encryption_mode")? as u8;
            if encryption_mode > 0b00 {
                packet.encrypted = true;
                packet.encryption_mode = Some(encryption_mode);
            }

            packet.random_access_flag = Some(data.read_field(1, "random_access_flag")? == 1);

            let length_indication = data.read_field(6, "length_indication")? as u8;
            if length_indication == 0b111111 {
                packet.fragmentation = true;
            }

            packet.address = Address::from_mac_resource(data)?;
            if packet.address.is_empty() {
                // The null PDU is always the last PDU of a block, any spare
                // capacity after it is fill bits.
                data.remove_fill_bits();
                return Ok(packet);
            }

            if data.read_field(1, "power_control_flag")? == 0b1 {
                packet.power_control_element = Some(data.read_field(4, "power_control_element")? as u8);
            }
            if data.read_field(1, "slot_granting_flag")? == 0b1 {
                packet.basic_slot_granting_element =
                    Some(data.read_field(8, "basic_slot_granting_element")? as u8);
            }
            if data.read_field(1, "channel_allocation_flag")? == 0b1 {
                packet.channel_allocation_element = Some(ChannelAllocationElement::from_buf(data)?);
            }

            let mac_header_length = preprocessing_bit_count - data.bits_left();
            if fill_bit_indication == 0b1 {
                data.remove_fill_bits();
            }

            let sdu_bits = if length_indication < 0b111110 {
                capped_sdu_bits(
                    LengthIndication::from_mac_resource(length_indication),
                    mac_header_length,
                    fill_bit_indication == 0b1,
                    data,
                )?
            } else {
                data.bits_left()
            };
            packet.tm_sdu = Some(data.take_vector(sdu_bits)?);

            Ok(packet)
        }
        0b01 => {
            // MAC-FRAG or MAC-END
            if data.read_field(1, "subtype")? == 0b0 {
                if channel == LogicalChannel::Stch {
                    return Err(PduParseErr::Unexpected { field: "MAC-FRAG on stealing channel" });
                }
                let mut packet = UpperMacCPlaneSignallingPacket::new(
                    channel,
                    direction,
                    MacPacketType::MacFragmentDownlink,
                );
                if data.read_field(1, "fill_bit_indication")? == 0b1 {
                    data.remove_fill_bits();
                }
                packet.tm_sdu = Some(data.take_vector(data.bits_left())?);
                return Ok(packet);
            }

            let mut packet = UpperMacCPlaneSignallingPacket::new(
                channel,
                direction,
                MacPacketType::MacEndDownlink,
            );
            let fill_bit_indication = data.read_field(1, "fill_bit_indication")?;
            packet.position_of_grant = Some(data.read_field(1, "position_of_grant")? as u8);
            let length_indication = data.read_field(6, "length_indication")? as u8;
            if data.read_field(1, "slot_granting_flag")? == 0b1 {
                packet.basic_slot_granting_element =
                    Some(data.read_field(8, "basic_slot_granting_element")? as u8);
            }
            if data.read_field(1, "channel_allocation_flag")? == 0b1 {
                packet.channel_allocation_element = Some(ChannelAllocationElement::from_buf(data)?);
            }

            let mac_header_length = preprocessing_bit_count - data.bits_left();
            if fill_bit_indication == 0b1 {
                data.remove_fill_bits();
            }
            let sdu_bits = capped_sdu_bits(
                LengthIndication::from_mac_end_downlink(length_indication),
                mac_header_length,
                fill_bit_indication == 0b1,
                data,
            )?;
            packet.tm_sdu = Some(data.take_vector(sdu_bits)?);

            Ok(packet)
        }
        0b10 => Err(PduParseErr::Unexpected { field: "broadcast in c-plane parser" }),
        _ => {
            // Supplementary MAC PDU
            if data.read_field(1, "subtype")? == 0b1 {
                return Err(PduParseErr::InvalidValue { field: "supplementary_subtype", value: 1 });
            }
            if channel != LogicalChannel::SchF {
                return Err(PduParseErr::Unexpected { field: "MAC-D-BLCK outside SCH/F" });
            }

            let mut packet =
                UpperMacCPlaneSignallingPacket::new(channel, direction, MacPacketType::MacDBlck);
            if data.read_field(1, "fill_bit_indication")? == 0b1 {
                data.remove_fill_bits();
            }
            let encryption_mode = data.read_field(2, "encryption_mode")? as u8;
            if encryption_mode > 0b00 {
                packet.encrypted = true;
                packet.encryption_mode = Some(encryption_mode);
            }
            packet.address.event_label = Some(data.read_field(10, "event_label")? as u16);
            packet.immediate_napping_permission_flag =
                Some(data.read_field(1, "immediate_napping_permission_flag")? == 1);
            if data.read_field(1, "slot_granting_flag")? == 0b1 {
                packet.basic_slot_granting_element =
                    Some(data.read_field(8, "basic_slot_granting_element")? as u8);
            }
            packet.tm_sdu = Some(data.take_vector(data.bits_left())?);

            Ok(packet)
        }
    }
}

fn parse_u_plane_signalling(
    channel: LogicalChannel,
    mut data: BitBuffer,
) -> Result<UpperMacUPlaneSignallingPacket, PduParseErr> {
    let pdu_type = data.read_field(2, "pdu_type")?;
    if pdu_type != 0b11 {
        return Err(PduParseErr::InvalidPduType { expected: 0b11, found: pdu_type });
    }
    let second_slot_stolen = data.read_field(1, "second_slot_stolen")? == 1;
    let tm_sdu = data.take_vector(data.bits_left())?;

    Ok(UpperMacUPlaneSignallingPacket {
        logical_channel: channel,
        ptype: MacPacketType::MacUSignal,
        second_slot_stolen,
        tm_sdu,
    })
}

/// TM-SDU length from a length indication: declared PDU size minus the
/// header. When fill bits are in play the declared size may exceed the
/// available bits by up to 7 bits of octet-alignment slack; a discrepancy
/// of 8 bits or more is corruption.
fn capped_sdu_bits(
    declared_pdu_bits: usize,
    mac_header_length: usize,
    fill_bits: bool,
    data: &BitBuffer,
) -> Result<usize, PduParseErr> {
    if declared_pdu_bits < mac_header_length {
        return Err(PduParseErr::InconsistentLength {
            expected: declared_pdu_bits,
            found: mac_header_length,
        });
    }
    let mut sdu_bits = declared_pdu_bits - mac_header_length;
    if fill_bits && sdu_bits > data.bits_left() {
        if sdu_bits - data.bits_left() >= 8 {
            return Err(PduParseErr::InconsistentLength {
                expected: sdu_bits,
                found: data.bits_left(),
            });
        }
        sdu_bits = data.bits_left();
    }
    Ok(sdu_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(channel: LogicalChannel, data: BitBuffer, crc_ok: bool) -> LogicalChannelDataAndCrc {
        LogicalChannelDataAndCrc { channel, data, crc_ok }
    }

    #[test]
    fn mac_resource_with_ssi_and_sdu() {
        let mut data = BitBuffer::new_autoexpand(128);
        data.write_bits(0b00, 2); // MAC-RESOURCE
        data.write_bits(0, 1); // no fill bits
        data.write_bits(0, 1); // position of grant
        data.write_bits(0b00, 2); // clear
        data.write_bits(0, 1); // no random access ack
        data.write_bits(8, 6); // length indication: 8 octets
        data.write_bits(0b001, 3); // SSI
        data.write_bits(0x123456, 24);
        data.write_bits(0, 1); // no power control
        data.write_bits(0, 1); // no slot granting
        data.write_bits(0, 1); // no channel allocation
        // 43 header bits so far, sdu fills up to 64
        data.write_bits(0x155555 >> 3, 21);
        data.seek(0);

        let packets = parse_logical_channel(
            BurstType::Ndb,
            &slot(LogicalChannel::SchF, data, true),
        )
        .unwrap();

        assert_eq!(packets.c_plane_signalling_packets.len(), 1);
        let packet = &packets.c_plane_signalling_packets[0];
        assert_eq!(packet.ptype, MacPacketType::MacResource);
        assert_eq!(packet.direction, Direction::Dl);
        assert_eq!(packet.address.ssi, Some(0x123456));
        assert!(!packet.encrypted);
        assert_eq!(packet.tm_sdu.as_ref().unwrap().bits_left(), 21);
    }

    #[test]
    fn null_pdu_terminates_block() {
        let mut data = BitBuffer::new_autoexpand(64);
        data.write_bits(0b00, 2);
        data.write_bits(0, 1);
        data.write_bits(0, 1);
        data.write_bits(0b00, 2);
        data.write_bits(0, 1);
        data.write_bits(0, 6); // length indication 0
        data.write_bits(0b000, 3); // null pdu address
        // spare capacity is fill bits
        data.write_bits(1, 1);
        data.write_bits(0, 31);
        data.seek(0);

        let packets = parse_logical_channel(
            BurstType::Ndb,
            &slot(LogicalChannel::SchF, data, true),
        )
        .unwrap();

        assert_eq!(packets.c_plane_signalling_packets.len(), 1);
        assert!(packets.c_plane_signalling_packets[0].is_null_pdu());
    }

    #[test]
    fn mac_access_on_sch_hu() {
        let mut data = BitBuffer::new_autoexpand(92);
        data.write_bits(0, 1); // MAC-ACCESS
        data.write_bits(0, 1); // no fill bits
        data.write_bits(0, 1); // not encrypted
        data.write_bits(0b00, 2); // SSI
        data.write_bits(0x00ABCD, 24);
        data.write_bits(1, 1); // optional field follows
        data.write_bits(0, 1); // length indication
        data.write_bits(5, 5); // 5 octets
        data.write_bits(0b1010, 4); // 40 - 36 header bits of TM-SDU
        // MAC padding for the rest of the 92-bit block
        data.write_bits(1, 1);
        data.write_bits(0, 51);
        data.seek(0);

        let packets = parse_logical_channel(
            BurstType::Cub,
            &slot(LogicalChannel::SchHu, data, true),
        )
        .unwrap();

        assert_eq!(packets.c_plane_signalling_packets.len(), 1);
        let packet = &packets.c_plane_signalling_packets[0];
        assert_eq!(packet.ptype, MacPacketType::MacAccess);
        assert_eq!(packet.direction, Direction::Ul);
        assert_eq!(packet.address.ssi, Some(0x00ABCD));
        let sdu = packet.tm_sdu.as_ref().unwrap();
        assert_eq!(sdu.to_bitstr(), "1010");
    }

    #[test]
    fn crc_failed_signalling_yields_nothing() {
        let data = BitBuffer::from_bitstr("0000000000000000");
        let packets = parse_logical_channel(
            BurstType::Ndb,
            &slot(LogicalChannel::SchHd, data, false),
        )
        .unwrap();
        assert!(packets.c_plane_signalling_packets.is_empty());
        assert!(packets.broadcast_packet.is_none());
    }

    #[test]
    fn traffic_passes_through() {
        let data = BitBuffer::from_bitstr("10110100");
        let packets = parse_logical_channel(
            BurstType::Ndb,
            &slot(LogicalChannel::Tch, data, true),
        )
        .unwrap();
        let traffic = packets.u_plane_traffic_packet.unwrap();
        assert_eq!(traffic.data.to_bitstr(), "10110100");
    }

    #[test]
    fn u_signal_on_stealing_channel() {
        let mut data = BitBuffer::new_autoexpand(32);
        data.write_bits(0b11, 2);
        data.write_bits(1, 1); // second slot stolen
        data.write_bits(0xAB, 8);
        data.seek(0);

        let packets = parse_logical_channel(
            BurstType::NdbSplit,
            &slot(LogicalChannel::Stch, data, true),
        )
        .unwrap();
        assert_eq!(packets.u_plane_signalling_packets.len(), 1);
        let packet = &packets.u_plane_signalling_packets[0];
        assert!(packet.second_slot_stolen);
        assert_eq!(packet.tm_sdu.bits_left(), 8);
    }

    #[test]
    fn oversized_length_indication_is_rejected() {
        let mut data = BitBuffer::new_autoexpand(64);
        data.write_bits(0b00, 2);
        data.write_bits(1, 1); // fill bits indicated
        data.write_bits(0, 1);
        data.write_bits(0b00, 2);
        data.write_bits(0, 1);
        data.write_bits(20, 6); // declares 160 bits, block has far less
        data.write_bits(0b001, 3);
        data.write_bits(0x000001, 24);
        data.write_bits(0, 1);
        data.write_bits(0, 1);
        data.write_bits(0, 1);
        data.write_bits(1, 1); // fill bit terminator
        data.seek(0);

        let result = parse_logical_channel(
            BurstType::Ndb,
            &slot(LogicalChannel::SchF, data, true),
        );
        assert!(matches!(result, Err(PduParseErr::InconsistentLength { .. })));
    }

    #[test]
    fn broadcast_on_uplink_is_rejected() {
        let data = BitBuffer::from_bitstr("1000000000000000000000000000000000000000");
        assert!(
            parse_logical_channel(BurstType::Nub, &slot(LogicalChannel::SchF, data, true)).is_err()
        );
    }
}

//! JSON egress of decoded packets.
//!
//! Every decoded packet leaves the receiver as one JSON object in a UDP
//! datagram. The envelope is versioned and keyed by the deepest parsed
//! layer; slots whose signalling CRC failed go out under a distinct key for
//! offline re-analysis.

use std::io;
use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde_json::{Value, json};
use tetra_core::{Address, BitBuffer, Direction, LogicalChannel};
use tetra_pdus::parser::DecodedPacket;
use tetra_pdus::type234::{ElementIdentifier, Type34Element};
use tetra_pdus::umac::slot::Slots;

/// Version of the egress JSON schema.
pub const PROTOCOL_VERSION: u32 = 0;

/// One item queued for the sender thread.
pub enum EgressItem {
    Packet(DecodedPacket),
    FailedSlots(Slots),
}

/// Where serialized packets go. The UDP implementation is the default;
/// tests substitute their own.
pub trait PacketSink: Send {
    fn send(&mut self, envelope: &Value) -> io::Result<()>;
}

/// Sink sending each envelope as one UDP datagram to the configured port.
pub struct UdpJsonSink {
    socket: UdpSocket,
}

impl UdpJsonSink {
    pub fn new(send_port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind(("127.0.0.1", 0))?;
        socket.connect(("127.0.0.1", send_port))?;
        Ok(UdpJsonSink { socket })
    }
}

impl PacketSink for UdpJsonSink {
    fn send(&mut self, envelope: &Value) -> io::Result<()> {
        self.socket.send(envelope.to_string().as_bytes())?;
        Ok(())
    }
}

/// Serialize the remaining bits of a buffer as whole bytes plus the number
/// of significant bits in the last byte.
pub fn bits_to_json(buf: &BitBuffer) -> Value {
    let mut data = buf.clone();
    data.seek(0);

    let mut bytes = Vec::new();
    while data.bits_left() >= 8 {
        bytes.push(data.read_bits(8).unwrap() as u8);
    }
    let rem = data.bits_left();
    let bits_in_last_byte = if rem > 0 {
        bytes.push((data.read_bits(rem).unwrap() as u8) << (8 - rem));
        rem
    } else {
        8
    };

    json!({ "bytes": bytes, "bits_in_last_byte": bits_in_last_byte })
}

/// Serialize only the address components that are present.
pub fn address_to_json(address: &Address) -> Value {
    let mut object = serde_json::Map::new();
    if let Some(v) = address.country_code {
        object.insert("country_code".into(), v.into());
    }
    if let Some(v) = address.network_code {
        object.insert("network_code".into(), v.into());
    }
    if let Some(v) = address.sna {
        object.insert("sna".into(), v.into());
    }
    if let Some(v) = address.ssi {
        object.insert("ssi".into(), v.into());
    }
    if let Some(v) = address.event_label {
        object.insert("event_label".into(), v.into());
    }
    if let Some(v) = address.ussi {
        object.insert("ussi".into(), v.into());
    }
    if let Some(v) = address.smi {
        object.insert("smi".into(), v.into());
    }
    if let Some(v) = address.usage_marker {
        object.insert("usage_marker".into(), v.into());
    }
    Value::Object(object)
}

fn direction_discriminant(direction: Direction) -> u8 {
    match direction {
        Direction::Ul => 0,
        Direction::Dl => 1,
    }
}

fn logical_channel_discriminant(channel: LogicalChannel) -> u8 {
    match channel {
        LogicalChannel::SchHd => 0,
        LogicalChannel::SchHu => 1,
        LogicalChannel::Tch => 2,
        LogicalChannel::SchF => 3,
        LogicalChannel::Stch => 4,
    }
}

fn optional_elements_to_json<E: ElementIdentifier>(
    elements: &std::collections::BTreeMap<E, Type34Element>,
) -> Value {
    let mut object = serde_json::Map::new();
    for (id, element) in elements {
        object.insert(
            id.raw().to_string(),
            json!({
                "repeated_elements": element.repeated_elements,
                "unparsed_bits": bits_to_json(&element.unparsed_bits),
            }),
        );
    }
    Value::Object(object)
}

/// The layer-specific `value` object, walking outermost to innermost.
pub fn packet_to_json(packet: &DecodedPacket) -> Value {
    let llc = packet.llc();
    let mac = &llc.mac;

    let mut value = serde_json::Map::new();
    value.insert(
        "mac".into(),
        json!({
            "logical_channel": logical_channel_discriminant(mac.logical_channel),
            "direction": direction_discriminant(mac.direction),
            "type": mac.ptype.discriminant(),
            "encrypted": mac.encrypted,
            "address": address_to_json(&mac.address),
            "fragmentation": mac.fragmentation,
            "tm_sdu": mac.tm_sdu.as_ref().map(bits_to_json),
        }),
    );
    value.insert(
        "llc".into(),
        json!({
            "basic_link": llc.basic_link_information.map(|info| json!({
                "basic_link_type": info.basic_link_type.discriminant(),
                "n_r": info.n_r,
                "n_s": info.n_s,
                "fcs_good": info.fcs_good,
            })),
            "tl_sdu": bits_to_json(&llc.tl_sdu),
        }),
    );

    let mle = match packet {
        DecodedPacket::LogicalLinkControl(_) => None,
        DecodedPacket::MobileLinkEntity(mle) => Some(mle),
        DecodedPacket::CircuitModeControlEntity(cmce) => Some(&cmce.mle),
        DecodedPacket::MobileManagement(mm) => Some(&mm.mle),
        DecodedPacket::ShortDataService(sds) => Some(&sds.cmce.mle),
    };
    if let Some(mle) = mle {
        value.insert(
            "mle".into(),
            json!({
                "protocol": mle.mle_protocol.discriminant(),
                "sdu": bits_to_json(&mle.sdu),
            }),
        );
    }

    match packet {
        DecodedPacket::CircuitModeControlEntity(cmce) => {
            value.insert("cmce".into(), cmce_to_json(cmce));
        }
        DecodedPacket::ShortDataService(sds) => {
            value.insert("cmce".into(), cmce_to_json(&sds.cmce));
            value.insert(
                "sds".into(),
                json!({
                    "protocol_identifier": sds.protocol_identifier,
                    "location_information_protocol":
                        sds.location_information_protocol.as_ref().map(|lip| json!({
                            "pdu_type": lip.pdu_type,
                            "short_location_report":
                                lip.short_location_report.as_ref().map(|report| json!({
                                    "time_elapsed": report.time_elapsed,
                                    "longitude": report.longitude,
                                    "latitude": report.latitude,
                                    "position_error": report.position_error,
                                    "horizontal_velocity": report.horizontal_velocity,
                                    "direction_of_travel": report.direction_of_travel,
                                    "additional_data": report.additional_data,
                                })),
                        })),
                }),
            );
        }
        DecodedPacket::MobileManagement(mm) => {
            let mut mm_value = serde_json::Map::new();
            mm_value.insert("packet_type".into(), mm.packet_type.discriminant().into());
            if let Some(accept) = &mm.location_update_accept {
                mm_value.insert(
                    "location_update_accept".into(),
                    json!({
                        "accept_type": accept.location_update_accept_type.discriminant(),
                        "address": address_to_json(&accept.address),
                        "subscriber_class": accept.subscriber_class,
                        "energy_saving_information": accept.energy_saving_information,
                        "optional_elements": optional_elements_to_json(&accept.optional_elements),
                    }),
                );
            }
            if let Some(ack) = &mm.attach_detach_group_identity_ack {
                mm_value.insert(
                    "attach_detach_group_identity_ack".into(),
                    json!({
                        "group_identity_accept_reject": ack.group_identity_accept_reject,
                        "optional_elements": optional_elements_to_json(&ack.optional_elements),
                    }),
                );
            }
            value.insert("mm".into(), Value::Object(mm_value));
        }
        _ => {}
    }

    Value::Object(value)
}

fn cmce_to_json(cmce: &tetra_pdus::cmce::CircuitModeControlEntityPacket) -> Value {
    json!({
        "packet_type": cmce.packet_type.discriminant(),
        "sds_data": cmce.sds_data.as_ref().map(|sds| json!({
            "area_selection": sds.area_selection,
            "address": address_to_json(&sds.address),
            "data": bits_to_json(&sds.data),
            "optional_elements": optional_elements_to_json(&sds.optional_elements),
        })),
    })
}

/// The raw-slots envelope for bursts whose signalling CRC failed.
pub fn failed_slots_to_json(slots: &Slots) -> Value {
    let mut slot_values = Vec::new();
    for slot in slots.concrete_slots() {
        slot_values.push(json!({
            "logical_channel": logical_channel_discriminant(slot.channel),
            "data": bits_to_json(&slot.data),
            "crc_ok": slot.crc_ok,
        }));
    }
    json!({
        "burst_type": slots.burst_type().to_string(),
        "slots": slot_values,
    })
}

/// Wrap a value in the versioned egress envelope.
pub fn envelope(key: &str, value: Value, station: &str) -> Value {
    json!({
        "protocol_version": PROTOCOL_VERSION,
        "key": key,
        "value": value,
        "time": chrono::Local::now().to_rfc3339(),
        "station": station,
    })
}

/// Spawn the sender thread draining the egress FIFO into `sink`. The
/// thread exits once the termination flag is set and the queue is empty,
/// or when all senders are gone. Egress I/O errors are logged and the
/// pipeline keeps running.
pub fn spawn_sender(
    receiver: Receiver<EgressItem>,
    mut sink: Box<dyn PacketSink>,
    termination: Arc<AtomicBool>,
    station: String,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("egress-sender".into())
        .spawn(move || {
            loop {
                match receiver.recv_timeout(Duration::from_millis(10)) {
                    Ok(item) => {
                        let envelope = match &item {
                            EgressItem::Packet(packet) => {
                                let value = packet_to_json(packet);
                                envelope(packet.key(), value, &station)
                            }
                            EgressItem::FailedSlots(slots) => {
                                envelope("FailedSlots", failed_slots_to_json(slots), &station)
                            }
                        };
                        if let Err(e) = sink.send(&envelope) {
                            tracing::warn!("egress send failed: {}", e);
                        }
                        if let EgressItem::Packet(packet) = &item {
                            if !packet.llc().is_acknowledgement() {
                                tracing::info!("decoded {}", packet.key());
                            }
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if termination.load(Ordering::Acquire) && receiver.is_empty() {
                            return;
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
        })
        .expect("failed to spawn egress sender")
}

//! Short Data Service payload parsing, including the Location Information
//! Protocol (ETSI TS 100 392-18-1).

use tetra_core::{BitBuffer, PduParseErr};

use crate::cmce::CircuitModeControlEntityPacket;

const POSITION_ERROR: [&str; 8] = [
    "< 2 m", "< 20 m", "< 200 m", "< 2 km", "< 20 km", "<= 200 km", "> 200 km", "unknown",
];

const DIRECTION_OF_TRAVEL: [&str; 16] = [
    "0 N", "22.5 NNE", "45 NE", "67.5 ENE", "90 E", "112.5 ESE", "135 SE", "157.5 SSE", "180 S",
    "202.5 SSW", "225 SW", "247.5 WSW", "270 W", "292.5 WNW", "315 NW", "337.5 NNW",
];

fn integer_to_double(mut data: u32, bits: usize, multiplier: f64) -> f64 {
    if data & (1 << (bits - 1)) != 0 {
        data = (!data).wrapping_add(1) & (0xFFFFFFFF >> (32 - bits));
        return -multiplier * data as f64 / (1u64 << (bits - 1)) as f64;
    }
    multiplier * data as f64 / (1u64 << (bits - 1)) as f64
}

fn decode_longitude(v: u32) -> f64 {
    integer_to_double(v, 25, 180.0)
}

fn decode_latitude(v: u32) -> f64 {
    integer_to_double(v, 24, 90.0)
}

/// 16 * 1.038^(v - 13) m/s; 127 means unknown.
fn decode_horizontal_velocity(v: u8) -> Option<f64> {
    if v == 127 {
        return None;
    }
    Some(16.0 * 1.038f64.powi(v as i32 - 13))
}

/// LIP short location report (pdu type 0b00).
#[derive(Debug, Clone, PartialEq)]
pub struct ShortLocationReport {
    pub time_elapsed: u8,
    /// degrees, positive east
    pub longitude: f64,
    /// degrees, positive north
    pub latitude: f64,
    /// 3-bit position error class
    pub position_error: u8,
    /// m/s, None when the field reads "unknown"
    pub horizontal_velocity: Option<f64>,
    /// 4-bit compass sector
    pub direction_of_travel: u8,
    pub type_of_additional_data: u8,
    pub additional_data: u8,
}

impl ShortLocationReport {
    pub fn from_buf(data: &mut BitBuffer) -> Result<Self, PduParseErr> {
        Ok(ShortLocationReport {
            time_elapsed: data.read_field(2, "time_elapsed")? as u8,
            longitude: decode_longitude(data.read_field(25, "longitude")? as u32),
            latitude: decode_latitude(data.read_field(24, "latitude")? as u32),
            position_error: data.read_field(3, "position_error")? as u8,
            horizontal_velocity: decode_horizontal_velocity(
                data.read_field(7, "horizontal_velocity")? as u8,
            ),
            direction_of_travel: data.read_field(4, "direction_of_travel")? as u8,
            type_of_additional_data: data.read_field(1, "type_of_additional_data")? as u8,
            additional_data: data.read_field(8, "additional_data")? as u8,
        })
    }

    pub fn position_error_description(&self) -> &'static str {
        POSITION_ERROR[(self.position_error & 0x7) as usize]
    }

    pub fn direction_of_travel_description(&self) -> &'static str {
        DIRECTION_OF_TRAVEL[(self.direction_of_travel & 0xf) as usize]
    }
}

/// Location Information Protocol wrapper (protocol identifier 0x0A).
#[derive(Debug, Clone, PartialEq)]
pub struct LocationInformationProtocol {
    pub pdu_type: u8,
    pub short_location_report: Option<ShortLocationReport>,
}

impl LocationInformationProtocol {
    pub fn from_buf(data: &mut BitBuffer) -> Result<Self, PduParseErr> {
        let pdu_type = data.read_field(2, "lip_pdu_type")? as u8;
        let short_location_report = if pdu_type == 0b00 {
            Some(ShortLocationReport::from_buf(data)?)
        } else {
            None
        };
        Ok(LocationInformationProtocol { pdu_type, short_location_report })
    }
}

/// An SDS-DATA packet with its user payload interpreted.
#[derive(Debug, Clone)]
pub struct ShortDataServicePacket {
    pub cmce: CircuitModeControlEntityPacket,
    pub protocol_identifier: u8,
    pub location_information_protocol: Option<LocationInformationProtocol>,
}

impl ShortDataServicePacket {
    pub const LOCATION_INFORMATION_PROTOCOL_IDENTIFIER: u8 = 0b00001010;

    pub fn parse(cmce: CircuitModeControlEntityPacket) -> Result<Self, PduParseErr> {
        let sds_data = cmce
            .sds_data
            .as_ref()
            .ok_or(PduParseErr::Unexpected { field: "sds packet without sds data" })?;
        let mut data = sds_data.data.clone();
        data.seek(0);

        let protocol_identifier = data.read_field(8, "protocol_identifier")? as u8;
        let location_information_protocol =
            if protocol_identifier == Self::LOCATION_INFORMATION_PROTOCOL_IDENTIFIER {
                Some(LocationInformationProtocol::from_buf(&mut data)?)
            } else {
                None
            };

        Ok(ShortDataServicePacket { cmce, protocol_identifier, location_information_protocol })
    }
}

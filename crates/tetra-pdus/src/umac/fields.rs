//! Broadcast and channel-allocation field elements of the upper MAC.

use tetra_core::{BitBuffer, PduParseErr};

/// Default definition for access code A (Clause 21.4.7.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessCodeDefinition {
    /// 4 bits
    pub immediate: u8,
    /// 4 bits
    pub waiting_time: u8,
    /// 4 bits
    pub number_of_random_access_transmissions_on_uplink: u8,
    /// 1 bit
    pub frame_length_factor: u8,
    /// 4 bits
    pub timeslot_pointer: u8,
    /// 3 bits
    pub minimum_pdu_priority: u8,
}

impl AccessCodeDefinition {
    pub fn from_buf(buf: &mut BitBuffer) -> Result<Self, PduParseErr> {
        Ok(AccessCodeDefinition {
            immediate: buf.read_field(4, "immediate")? as u8,
            waiting_time: buf.read_field(4, "waiting_time")? as u8,
            number_of_random_access_transmissions_on_uplink: buf
                .read_field(4, "number_of_random_access_transmissions")?
                as u8,
            frame_length_factor: buf.read_field(1, "frame_length_factor")? as u8,
            timeslot_pointer: buf.read_field(4, "timeslot_pointer")? as u8,
            minimum_pdu_priority: buf.read_field(3, "minimum_pdu_priority")? as u8,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedServiceBroadcastSection1 {
    pub data_priority_supported: u8,
    pub extended_advanced_links_and_max_ublck_supported: u8,
    pub qos_negotiation_supported: u8,
    pub d8psk_service: u8,
    pub section2_sent: u8,
    pub section3_sent: u8,
    pub section4_sent: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedServiceBroadcastSection2 {
    pub service_25qam: u8,
    pub service_50qam: u8,
    pub service_100qam: u8,
    pub service_150qam: u8,
    pub reserved: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedServiceBroadcast {
    pub security_information: u8,
    pub sdstl_addressing_method: u8,
    pub gck_supported: u8,
    pub section1: Option<ExtendedServiceBroadcastSection1>,
    pub section2: Option<ExtendedServiceBroadcastSection2>,
    /// Sections 3 and 4 carry only reserved bits
    pub section3_reserved: Option<u8>,
    pub section4_reserved: Option<u8>,
}

impl ExtendedServiceBroadcast {
    pub fn from_buf(buf: &mut BitBuffer) -> Result<Self, PduParseErr> {
        let mut element = ExtendedServiceBroadcast {
            security_information: buf.read_field(8, "security_information")? as u8,
            sdstl_addressing_method: buf.read_field(2, "sdstl_addressing_method")? as u8,
            gck_supported: buf.read_field(1, "gck_supported")? as u8,
            ..ExtendedServiceBroadcast::default()
        };
        match buf.read_field(2, "section")? {
            0b00 => {
                element.section1 = Some(ExtendedServiceBroadcastSection1 {
                    data_priority_supported: buf.read_field(1, "data_priority_supported")? as u8,
                    extended_advanced_links_and_max_ublck_supported: buf
                        .read_field(1, "extended_advanced_links")?
                        as u8,
                    qos_negotiation_supported: buf.read_field(1, "qos_negotiation_supported")? as u8,
                    d8psk_service: buf.read_field(1, "d8psk_service")? as u8,
                    section2_sent: buf.read_field(1, "section2_sent")? as u8,
                    section3_sent: buf.read_field(1, "section3_sent")? as u8,
                    section4_sent: buf.read_field(1, "section4_sent")? as u8,
                });
            }
            0b01 => {
                element.section2 = Some(ExtendedServiceBroadcastSection2 {
                    service_25qam: buf.read_field(1, "service_25qam")? as u8,
                    service_50qam: buf.read_field(1, "service_50qam")? as u8,
                    service_100qam: buf.read_field(1, "service_100qam")? as u8,
                    service_150qam: buf.read_field(1, "service_150qam")? as u8,
                    reserved: buf.read_field(3, "reserved")? as u8,
                });
            }
            0b10 => {
                element.section3_reserved = Some(buf.read_field(7, "reserved")? as u8);
            }
            _ => {
                element.section4_reserved = Some(buf.read_field(7, "reserved")? as u8);
            }
        }
        Ok(element)
    }
}

/// Duplex spacing table in kHz, indexed by [duplex spacing field][frequency
/// band]. -1 marks combinations reserved for future standardization.
const TETRA_DUPLEX_SPACING_KHZ: [[i32; 16]; 8] = [
    [-1, 1600, 10000, 10000, 10000, 10000, 10000, -1, -1, -1, -1, -1, -1, -1, -1, -1],
    [-1, 4500, -1, 36000, 7000, -1, -1, -1, 45000, 45000, -1, -1, -1, -1, -1, -1],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [-1, -1, -1, 8000, 8000, -1, -1, -1, 18000, 18000, -1, -1, -1, -1, -1, -1],
    [-1, -1, -1, 18000, 5000, -1, 30000, 30000, -1, 39000, -1, -1, -1, -1, -1, -1],
    [-1, -1, -1, -1, 9500, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1],
    [-1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1],
    [-1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1],
];

/// D-MLE-SYSINFO broadcast payload (Clause 21.4.4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    /// Downlink main carrier frequency in Hz, derived from band, carrier
    /// number and offset.
    pub downlink_frequency: i64,
    /// Uplink main carrier frequency in Hz; 0 when the duplex spacing is
    /// reserved.
    pub uplink_frequency: i64,
    pub number_secondary_control_channels_main_carrier: u8,
    pub ms_txpwr_max_cell: u8,
    pub rxlev_access_min: u8,
    pub access_parameter: u8,
    pub radio_downlink_timeout: u8,
    pub hyper_frame_number: Option<u16>,
    pub common_cipher_key_identifier: Option<u16>,
    pub even_multi_frame_definition_for_ts_mode: Option<u32>,
    pub odd_multi_frame_definition_for_ts_mode: Option<u32>,
    pub defaults_for_access_code_a: Option<AccessCodeDefinition>,
    pub extended_service_broadcast: Option<ExtendedServiceBroadcast>,
    pub location_area: u16,
    pub subscriber_class: u16,
    pub registration: u8,
    pub deregistration: u8,
    pub priority_cell: u8,
    pub minimum_mode_service: u8,
    pub migration: u8,
    pub system_wide_service: u8,
    pub tetra_voice_service: u8,
    pub circuit_mode_data_service: u8,
    pub sndcp_service: u8,
    pub air_interface_encryption_service: u8,
    pub advanced_link_supported: u8,
}

impl SystemInfo {
    pub fn from_buf(buf: &mut BitBuffer) -> Result<Self, PduParseErr> {
        let main_carrier = buf.read_field(12, "main_carrier")? as i64;
        let frequency_band = buf.read_field(4, "frequency_band")? as usize;
        let offset = buf.read_field(2, "offset")? as usize;
        let duplex_spacing_field = buf.read_field(3, "duplex_spacing")? as usize;
        let reverse_operation = buf.read_field(1, "reverse_operation")? != 0;
        let number_secondary_control_channels_main_carrier =
            buf.read_field(2, "number_secondary_ccch")? as u8;
        let ms_txpwr_max_cell = buf.read_field(3, "ms_txpwr_max_cell")? as u8;
        let rxlev_access_min = buf.read_field(4, "rxlev_access_min")? as u8;
        let access_parameter = buf.read_field(4, "access_parameter")? as u8;
        let radio_downlink_timeout = buf.read_field(4, "radio_downlink_timeout")? as u8;

        let mut hyper_frame_number = None;
        let mut common_cipher_key_identifier = None;
        if buf.read_field(1, "hyper_frame_cipher_key_flag")? == 0 {
            hyper_frame_number = Some(buf.read_field(16, "hyper_frame_number")? as u16);
        } else {
            common_cipher_key_identifier = Some(buf.read_field(16, "cipher_key_identifier")? as u16);
        }

        let mut even_multi_frame_definition_for_ts_mode = None;
        let mut odd_multi_frame_definition_for_ts_mode = None;
        let mut defaults_for_access_code_a = None;
        let mut extended_service_broadcast = None;
        match buf.read_field(2, "optional_field_flag")? {
            0b00 => {
                even_multi_frame_definition_for_ts_mode =
                    Some(buf.read_field(20, "even_mf_definition")? as u32);
            }
            0b01 => {
                odd_multi_frame_definition_for_ts_mode =
                    Some(buf.read_field(20, "odd_mf_definition")? as u32);
            }
            0b10 => {
                defaults_for_access_code_a = Some(AccessCodeDefinition::from_buf(buf)?);
            }
            _ => {
                extended_service_broadcast = Some(ExtendedServiceBroadcast::from_buf(buf)?);
            }
        }

        // downlink main carrier = base frequency + carrier * 25 kHz + offset
        const OFFSET_HZ: [i64; 4] = [0, 6250, -6250, 12500];
        let downlink_frequency =
            frequency_band as i64 * 100_000_000 + main_carrier * 25_000 + OFFSET_HZ[offset];

        let duplex_spacing_khz = TETRA_DUPLEX_SPACING_KHZ[duplex_spacing_field][frequency_band];
        let uplink_frequency = if duplex_spacing_khz < 0 {
            // reserved for future standardization
            0
        } else if reverse_operation {
            downlink_frequency + duplex_spacing_khz as i64 * 1000
        } else {
            downlink_frequency - duplex_spacing_khz as i64 * 1000
        };

        Ok(SystemInfo {
            downlink_frequency,
            uplink_frequency,
            number_secondary_control_channels_main_carrier,
            ms_txpwr_max_cell,
            rxlev_access_min,
            access_parameter,
            radio_downlink_timeout,
            hyper_frame_number,
            common_cipher_key_identifier,
            even_multi_frame_definition_for_ts_mode,
            odd_multi_frame_definition_for_ts_mode,
            defaults_for_access_code_a,
            extended_service_broadcast,
            location_area: buf.read_field(14, "location_area")? as u16,
            subscriber_class: buf.read_field(16, "subscriber_class")? as u16,
            registration: buf.read_field(1, "registration")? as u8,
            deregistration: buf.read_field(1, "deregistration")? as u8,
            priority_cell: buf.read_field(1, "priority_cell")? as u8,
            minimum_mode_service: buf.read_field(1, "minimum_mode_service")? as u8,
            migration: buf.read_field(1, "migration")? as u8,
            system_wide_service: buf.read_field(1, "system_wide_service")? as u8,
            tetra_voice_service: buf.read_field(1, "tetra_voice_service")? as u8,
            circuit_mode_data_service: {
                let v = buf.read_field(1, "circuit_mode_data_service")? as u8;
                let _reserved = buf.read_field(1, "reserved")?;
                v
            },
            sndcp_service: buf.read_field(1, "sndcp_service")? as u8,
            air_interface_encryption_service: buf.read_field(1, "aie_service")? as u8,
            advanced_link_supported: buf.read_field(1, "advanced_link_supported")? as u8,
        })
    }
}

/// ACCESS-DEFINE broadcast payload (Clause 21.4.4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDefine {
    pub common_or_assigned_control_channel_flag: u8,
    pub access_code: u8,
    pub access_code_definition: AccessCodeDefinition,
    pub subscriber_class_bitmap: Option<u16>,
    pub gssi: Option<u32>,
}

impl AccessDefine {
    pub fn from_buf(buf: &mut BitBuffer) -> Result<Self, PduParseErr> {
        let common_or_assigned_control_channel_flag =
            buf.read_field(1, "common_or_assigned_flag")? as u8;
        let access_code = buf.read_field(2, "access_code")? as u8;
        let access_code_definition = AccessCodeDefinition::from_buf(buf)?;

        let mut subscriber_class_bitmap = None;
        let mut gssi = None;
        match buf.read_field(2, "optional_field_flag")? {
            0b01 => subscriber_class_bitmap = Some(buf.read_field(16, "subscriber_class_bitmap")? as u16),
            0b10 => gssi = Some(buf.read_field(24, "gssi")? as u32),
            _ => {}
        }
        let _filler = buf.read_field(3, "filler_bits")?;

        Ok(AccessDefine {
            common_or_assigned_control_channel_flag,
            access_code,
            access_code_definition,
            subscriber_class_bitmap,
            gssi,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedCarrierNumbering {
    pub frequency_band: u8,
    pub offset: u8,
    pub duplex_spacing: u8,
    pub reverse_operation: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AugmentedChannelAllocation {
    pub up_downlink_assigned: u8,
    pub bandwidth: u8,
    pub modulation_mode: u8,
    pub maximum_uplink_qam_modulation_level: Option<u8>,
    pub conforming_channel_status: u8,
    pub bs_link_imbalance: u8,
    pub bs_transmit_power_relative_to_main_carrier: u8,
    pub napping_status: u8,
    pub napping_information: Option<u16>,
    pub conditional_element_a: Option<u16>,
    pub conditional_element_b: Option<u16>,
    pub further_augmentation_flag: u8,
}

/// Channel allocation element of MAC-RESOURCE and MAC-END (Clause 21.5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAllocationElement {
    pub allocation_type: u8,
    pub timeslot_assigned: u8,
    pub up_downlink_assigned: u8,
    pub clch_permission: u8,
    pub cell_change_flag: u8,
    pub carrier_number: u16,
    pub extended_carrier_numbering: Option<ExtendedCarrierNumbering>,
    pub monitoring_pattern: u8,
    pub frame18_monitoring_pattern: Option<u8>,
    pub augmented_channel_allocation: Option<AugmentedChannelAllocation>,
}

impl ChannelAllocationElement {
    pub fn from_buf(buf: &mut BitBuffer) -> Result<Self, PduParseErr> {
        let allocation_type = buf.read_field(2, "allocation_type")? as u8;
        let timeslot_assigned = buf.read_field(4, "timeslot_assigned")? as u8;
        let up_downlink_assigned = buf.read_field(2, "up_downlink_assigned")? as u8;
        let clch_permission = buf.read_field(1, "clch_permission")? as u8;
        let cell_change_flag = buf.read_field(1, "cell_change_flag")? as u8;
        let carrier_number = buf.read_field(12, "carrier_number")? as u16;

        let extended_carrier_numbering = if buf.read_field(1, "extended_carrier_flag")? == 1 {
            Some(ExtendedCarrierNumbering {
                frequency_band: buf.read_field(4, "frequency_band")? as u8,
                offset: buf.read_field(2, "offset")? as u8,
                duplex_spacing: buf.read_field(3, "duplex_spacing")? as u8,
                reverse_operation: buf.read_field(1, "reverse_operation")? as u8,
            })
        } else {
            None
        };

        let monitoring_pattern = buf.read_field(2, "monitoring_pattern")? as u8;
        let frame18_monitoring_pattern = if monitoring_pattern == 0b00 {
            Some(buf.read_field(2, "frame18_monitoring_pattern")? as u8)
        } else {
            None
        };

        let augmented_channel_allocation = if up_downlink_assigned == 0b00 {
            let aug_up_downlink_assigned = buf.read_field(2, "aug_up_downlink_assigned")? as u8;
            let bandwidth = buf.read_field(3, "bandwidth")? as u8;
            let modulation_mode = buf.read_field(3, "modulation_mode")? as u8;
            let maximum_uplink_qam_modulation_level = if modulation_mode == 0b010 {
                let level = buf.read_field(3, "max_uplink_qam_level")? as u8;
                let _reserved = buf.read_field(3, "reserved")?;
                Some(level)
            } else {
                None
            };
            let conforming_channel_status = buf.read_field(3, "conforming_channel_status")? as u8;
            let bs_link_imbalance = buf.read_field(4, "bs_link_imbalance")? as u8;
            let bs_transmit_power_relative_to_main_carrier =
                buf.read_field(5, "bs_tx_power_relative")? as u8;
            let napping_status = buf.read_field(2, "napping_status")? as u8;
            let napping_information = if napping_status == 0b01 {
                Some(buf.read_field(11, "napping_information")? as u16)
            } else {
                None
            };
            let _reserved = buf.read_field(4, "reserved")?;
            let conditional_element_a = if buf.read_field(1, "conditional_element_a_flag")? == 1 {
                Some(buf.read_field(16, "conditional_element_a")? as u16)
            } else {
                None
            };
            let conditional_element_b = if buf.read_field(1, "conditional_element_b_flag")? == 1 {
                Some(buf.read_field(16, "conditional_element_b")? as u16)
            } else {
                None
            };
            Some(AugmentedChannelAllocation {
                up_downlink_assigned: aug_up_downlink_assigned,
                bandwidth,
                modulation_mode,
                maximum_uplink_qam_modulation_level,
                conforming_channel_status,
                bs_link_imbalance,
                bs_transmit_power_relative_to_main_carrier,
                napping_status,
                napping_information,
                conditional_element_a,
                conditional_element_b,
                further_augmentation_flag: buf.read_field(1, "further_augmentation_flag")? as u8,
            })
        } else {
            None
        };

        Ok(ChannelAllocationElement {
            allocation_type,
            timeslot_assigned,
            up_downlink_assigned,
            clch_permission,
            cell_change_flag,
            carrier_number,
            extended_carrier_numbering,
            monitoring_pattern,
            frame18_monitoring_pattern,
            augmented_channel_allocation,
        })
    }
}

use crate::bitbuffer::BitBuffer;
use crate::pdu_parse_error::PduParseErr;

/// A sparse bundle of the identities a PDU may carry. Every component is
/// optional; equality is component-wise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// 10 bits
    pub country_code: Option<u16>,
    /// 14 bits
    pub network_code: Option<u16>,
    /// 8 bits, short number address
    pub sna: Option<u8>,
    /// 24 bits
    pub ssi: Option<u32>,
    /// 10 bits
    pub event_label: Option<u16>,
    /// 24 bits
    pub ussi: Option<u32>,
    /// 24 bits
    pub smi: Option<u32>,
    /// 6 bits
    pub usage_marker: Option<u8>,
}

impl Address {
    /// Overwrite each component that is present in `other`.
    pub fn merge(&mut self, other: &Address) {
        if other.country_code.is_some() {
            self.country_code = other.country_code;
        }
        if other.network_code.is_some() {
            self.network_code = other.network_code;
        }
        if other.sna.is_some() {
            self.sna = other.sna;
        }
        if other.ssi.is_some() {
            self.ssi = other.ssi;
        }
        if other.event_label.is_some() {
            self.event_label = other.event_label;
        }
        if other.ussi.is_some() {
            self.ussi = other.ussi;
        }
        if other.smi.is_some() {
            self.smi = other.smi;
        }
        if other.usage_marker.is_some() {
            self.usage_marker = other.usage_marker;
        }
    }

    pub fn merge_opt(&mut self, other: &Option<Address>) {
        if let Some(other) = other {
            self.merge(other);
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Address::default()
    }

    /// Address fields of MAC-ACCESS: 2-bit selector then the identity.
    /// Unknown selectors yield an empty address.
    pub fn from_mac_access(buf: &mut BitBuffer) -> Result<Address, PduParseErr> {
        Self::from_two_bit_selector(buf)
    }

    /// Address fields of MAC-DATA, same 2-bit encoding as MAC-ACCESS.
    pub fn from_mac_data(buf: &mut BitBuffer) -> Result<Address, PduParseErr> {
        Self::from_two_bit_selector(buf)
    }

    fn from_two_bit_selector(buf: &mut BitBuffer) -> Result<Address, PduParseErr> {
        let selector = buf.read_field(2, "address_type")?;
        let mut address = Address::default();
        match selector {
            0b00 => address.ssi = Some(buf.read_field(24, "ssi")? as u32),
            0b01 => address.event_label = Some(buf.read_field(10, "event_label")? as u16),
            0b10 => address.ussi = Some(buf.read_field(24, "ussi")? as u32),
            0b11 => address.smi = Some(buf.read_field(24, "smi")? as u32),
            _ => unreachable!(),
        }
        Ok(address)
    }

    /// Address fields of MAC-RESOURCE: 3-bit selector. Selector 0 is the
    /// null PDU and yields an empty address.
    pub fn from_mac_resource(buf: &mut BitBuffer) -> Result<Address, PduParseErr> {
        let selector = buf.read_field(3, "address_type")?;
        let mut address = Address::default();
        match selector {
            0b000 => {}
            0b001 => address.ssi = Some(buf.read_field(24, "ssi")? as u32),
            0b010 => address.event_label = Some(buf.read_field(10, "event_label")? as u16),
            0b011 => address.ussi = Some(buf.read_field(24, "ussi")? as u32),
            0b100 => address.smi = Some(buf.read_field(24, "smi")? as u32),
            0b101 => {
                address.ssi = Some(buf.read_field(24, "ssi")? as u32);
                address.event_label = Some(buf.read_field(10, "event_label")? as u16);
            }
            0b110 => {
                address.ssi = Some(buf.read_field(24, "ssi")? as u32);
                address.usage_marker = Some(buf.read_field(6, "usage_marker")? as u8);
            }
            0b111 => {
                address.smi = Some(buf.read_field(24, "smi")? as u32);
                address.event_label = Some(buf.read_field(10, "event_label")? as u16);
            }
            _ => unreachable!(),
        }
        Ok(address)
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(v) = self.country_code {
            write!(f, "MCC:{} ", v)?;
        }
        if let Some(v) = self.network_code {
            write!(f, "MNC:{} ", v)?;
        }
        if let Some(v) = self.sna {
            write!(f, "SNA:{} ", v)?;
        }
        if let Some(v) = self.ssi {
            write!(f, "SSI:{} ", v)?;
        }
        if let Some(v) = self.ussi {
            write!(f, "USSI:{} ", v)?;
        }
        if let Some(v) = self.smi {
            write!(f, "SMI:{} ", v)?;
        }
        if let Some(v) = self.event_label {
            write!(f, "EventLabel:{} ", v)?;
        }
        if let Some(v) = self.usage_marker {
            write!(f, "UsageMarker:{} ", v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_resource_ssi_and_usage_marker() {
        // selector 0b110, SSI 0x123456, usage marker 0x2A
        let mut buf = BitBuffer::new_autoexpand(64);
        buf.write_bits(0b110, 3);
        buf.write_bits(0x123456, 24);
        buf.write_bits(0x2A, 6);
        buf.seek(0);

        let address = Address::from_mac_resource(&mut buf).unwrap();
        assert_eq!(address.ssi, Some(0x123456));
        assert_eq!(address.usage_marker, Some(0x2A));
        assert_eq!(address.event_label, None);
        assert_eq!(address.ussi, None);
        assert_eq!(address.smi, None);
        assert_eq!(address.country_code, None);
    }

    #[test]
    fn mac_resource_null_pdu_address() {
        let mut buf = BitBuffer::new_autoexpand(8);
        buf.write_bits(0b000, 3);
        buf.seek(0);
        let address = Address::from_mac_resource(&mut buf).unwrap();
        assert!(address.is_empty());
    }

    #[test]
    fn merge_overwrites_present_components() {
        let mut a = Address { ssi: Some(1), event_label: Some(2), ..Address::default() };
        let b = Address { ssi: Some(9), usage_marker: Some(3), ..Address::default() };
        a.merge(&b);
        assert_eq!(a.ssi, Some(9));
        assert_eq!(a.event_label, Some(2));
        assert_eq!(a.usage_marker, Some(3));
    }

    #[test]
    fn merge_is_associative_on_present_sets() {
        let a = Address { ssi: Some(1), ..Address::default() };
        let b = Address { ssi: Some(2), event_label: Some(7), ..Address::default() };
        let c = Address { event_label: Some(8), smi: Some(5), ..Address::default() };

        let mut left = a.clone();
        left.merge(&b);
        left.merge(&c);

        let mut bc = b.clone();
        bc.merge(&c);
        let mut right = a.clone();
        right.merge(&bc);

        assert_eq!(left, right);
    }
}

//! Generic parser for the optional Type-2, Type-3 and Type-4 elements that
//! trail MM and CMCE PDUs.
//!
//! An initial O-bit gates the presence of any optional element. Each Type-2
//! element is announced by a P-bit; Type-3/4 elements repeat while the M-bit
//! is set, carrying a 4-bit element identifier and an 11-bit length
//! indicator (Type-4 additionally a 6-bit repeat count inside the length).

use std::collections::BTreeMap;

use tetra_core::{BitBuffer, PduParseErr};

/// A 4-bit Type-3/4 element identifier of some layer.
pub trait ElementIdentifier: Copy + Ord {
    fn from_raw(raw: u8) -> Option<Self>
    where
        Self: Sized;
    fn raw(self) -> u8;
}

/// An element kept unparsed: higher layers decide what to make of it.
#[derive(Debug, Clone)]
pub struct Type34Element {
    pub unparsed_bits: BitBuffer,
    pub repeated_elements: u8,
}

pub struct Type234Parser<E: ElementIdentifier + 'static> {
    present: bool,
    allowed_type3: &'static [E],
    allowed_type4: &'static [E],
}

impl<E: ElementIdentifier + 'static> Type234Parser<E> {
    /// Consumes the O-bit from `data`.
    pub fn new(
        data: &mut BitBuffer,
        allowed_type3: &'static [E],
        allowed_type4: &'static [E],
    ) -> Result<Self, PduParseErr> {
        let present = data.read_field(1, "o_bit")? == 1;
        Ok(Type234Parser { present, allowed_type3, allowed_type4 })
    }

    /// Parse one optional Type-2 element through `parse`. Returns None when
    /// the O-bit or this element's P-bit is absent.
    pub fn parse_type2<T>(
        &self,
        data: &mut BitBuffer,
        parse: impl FnOnce(&mut BitBuffer) -> Result<T, PduParseErr>,
    ) -> Result<Option<T>, PduParseErr> {
        if !self.present {
            return Ok(None);
        }
        if data.read_field(1, "p_bit")? == 0 {
            return Ok(None);
        }
        parse(data).map(Some)
    }

    /// Parse all trailing Type-3/4 elements into a map keyed by identifier.
    /// A repeated identifier is an error, as is one outside the allowed sets.
    pub fn parse_type34(
        &self,
        data: &mut BitBuffer,
    ) -> Result<BTreeMap<E, Type34Element>, PduParseErr> {
        let mut elements = BTreeMap::new();
        if !self.present {
            return Ok(elements);
        }

        while data.bits_left() > 0 {
            if data.read_field(1, "m_bit")? == 0 {
                break;
            }
            let raw_id = data.read_field(4, "element_identifier")? as u8;
            let length_indicator = data.read_field(11, "length_indicator")? as usize;

            let Some(id) = E::from_raw(raw_id) else {
                return Err(PduParseErr::InvalidValue {
                    field: "element_identifier",
                    value: raw_id as u64,
                });
            };

            let element = if self.allowed_type3.contains(&id) {
                Type34Element {
                    unparsed_bits: data.take_vector(length_indicator)?,
                    repeated_elements: 1,
                }
            } else if self.allowed_type4.contains(&id) {
                if length_indicator < 6 {
                    return Err(PduParseErr::InconsistentLength {
                        expected: 6,
                        found: length_indicator,
                    });
                }
                let repeated_elements = data.read_field(6, "repeated_elements")? as u8;
                Type34Element {
                    unparsed_bits: data.take_vector(length_indicator - 6)?,
                    repeated_elements,
                }
            } else {
                return Err(PduParseErr::InvalidValue {
                    field: "element_identifier",
                    value: raw_id as u64,
                });
            };

            if elements.insert(id, element).is_some() {
                return Err(PduParseErr::DuplicateElement { element_id: raw_id as u64 });
            }
        }

        Ok(elements)
    }
}

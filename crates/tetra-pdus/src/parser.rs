//! The L2/L3 layer chain: walk a C-plane MAC packet down through
//! LLC → MLE → CMCE/MM → SDS, stopping at the deepest layer that parses.
//!
//! A failure below a successfully parsed layer is contained: the enclosing
//! packet is emitted instead, so the sink never sees a partial parse.

use tetra_core::PduParseErr;

use crate::cmce::CircuitModeControlEntityPacket;
use crate::llc::LogicalLinkControlPacket;
use crate::mle::{MleProtocol, MobileLinkEntityPacket};
use crate::mm::MobileManagementPacket;
use crate::sds::ShortDataServicePacket;
use crate::umac::packet::UpperMacCPlaneSignallingPacket;

/// A fully parsed packet, tagged by the deepest layer reached.
#[derive(Debug, Clone)]
pub enum DecodedPacket {
    LogicalLinkControl(LogicalLinkControlPacket),
    MobileLinkEntity(MobileLinkEntityPacket),
    CircuitModeControlEntity(CircuitModeControlEntityPacket),
    MobileManagement(MobileManagementPacket),
    ShortDataService(ShortDataServicePacket),
}

impl DecodedPacket {
    /// The JSON envelope key of this packet.
    pub fn key(&self) -> &'static str {
        match self {
            DecodedPacket::LogicalLinkControl(_) => "LogicalLinkControlPacket",
            DecodedPacket::MobileLinkEntity(_) => "MobileLinkEntityPacket",
            DecodedPacket::CircuitModeControlEntity(_) => "CircuitModeControlEntityPacket",
            DecodedPacket::MobileManagement(_) => "MobileManagementPacket",
            DecodedPacket::ShortDataService(_) => "ShortDataServicePacket",
        }
    }

    /// The LLC view of this packet, whatever the deepest layer is.
    pub fn llc(&self) -> &LogicalLinkControlPacket {
        match self {
            DecodedPacket::LogicalLinkControl(llc) => llc,
            DecodedPacket::MobileLinkEntity(mle) => &mle.llc,
            DecodedPacket::CircuitModeControlEntity(cmce) => &cmce.mle.llc,
            DecodedPacket::MobileManagement(mm) => &mm.mle.llc,
            DecodedPacket::ShortDataService(sds) => &sds.cmce.mle.llc,
        }
    }
}

/// Parse a C-plane MAC packet (with TM-SDU) as deep as the discriminators
/// allow. Unknown discriminators pass through as the enclosing layer.
pub fn parse_packet_chain(
    mac: UpperMacCPlaneSignallingPacket,
) -> Result<DecodedPacket, PduParseErr> {
    let llc = LogicalLinkControlPacket::parse(mac)?;

    // only basic link PDUs with payload carry an MLE packet
    if llc.basic_link_information.is_none() || llc.tl_sdu.bits_left() == 0 {
        return Ok(DecodedPacket::LogicalLinkControl(llc));
    }

    let mle = match MobileLinkEntityPacket::parse(llc.clone()) {
        Ok(mle) => mle,
        Err(e) => {
            tracing::debug!("mle parse failed, emitting llc packet: {:?}", e);
            return Ok(DecodedPacket::LogicalLinkControl(llc));
        }
    };

    match mle.mle_protocol {
        MleProtocol::Mm => match MobileManagementPacket::parse(mle.clone()) {
            Ok(mm) => Ok(DecodedPacket::MobileManagement(mm)),
            Err(e) => {
                tracing::debug!("mm parse failed, emitting mle packet: {:?}", e);
                Ok(DecodedPacket::MobileLinkEntity(mle))
            }
        },
        MleProtocol::Cmce => {
            let cmce = match CircuitModeControlEntityPacket::parse(mle.clone()) {
                Ok(cmce) => cmce,
                Err(e) => {
                    tracing::debug!("cmce parse failed, emitting mle packet: {:?}", e);
                    return Ok(DecodedPacket::MobileLinkEntity(mle));
                }
            };
            if cmce.sds_data.is_some() {
                match ShortDataServicePacket::parse(cmce.clone()) {
                    Ok(sds) => Ok(DecodedPacket::ShortDataService(sds)),
                    Err(e) => {
                        tracing::debug!("sds parse failed, emitting cmce packet: {:?}", e);
                        Ok(DecodedPacket::CircuitModeControlEntity(cmce))
                    }
                }
            } else {
                Ok(DecodedPacket::CircuitModeControlEntity(cmce))
            }
        }
        // SNDCP, MLE service PDUs and the reserved spaces stay at MLE depth
        _ => Ok(DecodedPacket::MobileLinkEntity(mle)),
    }
}

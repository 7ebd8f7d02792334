use crate::bitbuffer::BitBuffer;

/// Logical channels a decoded block may belong to.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum LogicalChannel {
    /// SCH/HD, signalling channel half downlink
    SchHd,
    /// SCH/HU, signalling channel half uplink
    SchHu,
    /// TCH, traffic channel
    Tch,
    /// SCH/F, full-slot signalling channel
    SchF,
    /// STCH, stealing channel
    Stch,
}

impl core::fmt::Display for LogicalChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            LogicalChannel::SchHd => "SCH/HD",
            LogicalChannel::SchHu => "SCH/HU",
            LogicalChannel::Tch => "TCH",
            LogicalChannel::SchF => "SCH/F",
            LogicalChannel::Stch => "STCH",
        };
        write!(f, "{}", name)
    }
}

/// One decoded block: its channel, the type-1 bits and the CRC verdict.
/// Traffic channels carry descrambled bits with `crc_ok` forced true.
#[derive(Debug, Clone)]
pub struct LogicalChannelDataAndCrc {
    pub channel: LogicalChannel,
    pub data: BitBuffer,
    pub crc_ok: bool,
}

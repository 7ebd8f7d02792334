/// How ingress bytes map to synchronizer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// One bit per input octet (low bit significant), or 8 bits per octet
    /// LSB-first when `packed` is set.
    Bits,
    /// Raw IQ: pairs of little-endian f32 per symbol.
    Iq,
}

/// Receiver configuration, normally loaded from a TOML file.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// UDP port the PHY front end sends to. Ignored when `input_file` is set.
    pub receive_port: u16,
    /// UDP port decoded packets are sent to as JSON datagrams.
    pub send_port: u16,
    /// If true, unpack 8 bits per ingress octet, LSB first.
    pub packed: bool,
    /// Bit-stream or IQ-stream ingress.
    pub stream: StreamKind,
    /// When set, enables uplink-only decoding with this scrambling code
    /// instead of waiting for a BSCH.
    pub uplink_scrambling_code: Option<u32>,
    /// Replay ingress from this file instead of the socket.
    pub input_file: Option<String>,
    /// Tee the raw ingress byte stream to this file for later replay.
    pub output_file: Option<String>,
    /// Worker threads in the lower-MAC pool.
    pub num_workers: usize,
    /// Verbose logfile path.
    pub debug_log: Option<String>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            receive_port: 42000,
            send_port: 42100,
            packed: false,
            stream: StreamKind::Bits,
            uplink_scrambling_code: None,
            input_file: None,
            output_file: None,
            num_workers: 4,
            debug_log: None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PduParseErr {
    /// The bit cursor ran dry while reading a field.
    BufferEnded { field: Option<&'static str> },
    /// A whole-remainder extraction was attempted with more than 64 bits left.
    TakeAllTooLarge { bits_left: usize },
    InvalidPduType { expected: u64, found: u64 },
    InvalidValue { field: &'static str, value: u64 },
    /// A declared length disagrees with what was actually parsed or is
    /// available. Discrepancies of 8 bits or more are corruption, not
    /// fill-bit slack.
    InconsistentLength { expected: usize, found: usize },
    /// A Type-3/4 element identifier occurred twice in one block.
    DuplicateElement { element_id: u64 },
    /// A PDU appeared where the protocol forbids it (e.g. MAC-DBlck inside
    /// a fragmentation stream).
    Unexpected { field: &'static str },
    NotImplemented { field: Option<&'static str> },
}

/// Reads a fixed-width field into a local, converting underflow into a
/// PduParseErr::BufferEnded naming the field.
#[macro_export]
macro_rules! let_field {
    ($buf:expr, $ident:ident, $bits:expr) => {
        let $ident = $buf.read_field($bits, stringify!($ident))?;
    };
}

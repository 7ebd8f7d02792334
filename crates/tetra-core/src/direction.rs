#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Uplink
    Ul,
    /// Downlink
    Dl,
}

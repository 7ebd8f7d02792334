pub mod fragments;
pub mod upper_mac;

pub use fragments::FragmentReassembler;
pub use upper_mac::UpperMac;

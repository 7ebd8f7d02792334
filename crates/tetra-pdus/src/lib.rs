//! PDU types and stateless parsers for the TETRA receiver
//!
//! Everything in this crate is a pure function of its input bits: the upper
//! MAC packet builder, the Type-2/3/4 element machinery and the
//! LLC → MLE → CMCE/MM → SDS layer chain. Stateful concerns (fragment
//! reassembly, timebase, cell lock) live in `tetra-rx`.

pub mod cmce;
pub mod llc;
pub mod mle;
pub mod mm;
pub mod parser;
pub mod sds;
pub mod type234;
pub mod umac;

pub use parser::DecodedPacket;

//! The TETRA receive pipeline
//!
//! Channel-coding primitives, burst synchronization, lower and upper MAC
//! processing, the ordered worker pool and the ingress/egress plumbing.
//! Stateless PDU parsing lives in `tetra-pdus`.

pub mod decoder;
pub mod egress;
pub mod lmac;
pub mod pool;
pub mod sync;
pub mod umac;

pub use decoder::Decoder;
pub use pool::OrderedWorkerPool;

//! Wire protocol: low-level codec primitives and the relay message set.

pub mod codec;
pub mod relay;

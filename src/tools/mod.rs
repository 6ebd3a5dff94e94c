//! Typed command builders, one struct per tool verb.

pub mod az;
pub mod docker;
pub mod terraform;

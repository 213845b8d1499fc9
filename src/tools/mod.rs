//! Building blocks shared by the coder and decoder.

pub mod min_heap;
pub mod node_pool;
pub mod bits;
pub mod fnv;

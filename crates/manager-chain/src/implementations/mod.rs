pub mod alloy;

pub use alloy::{create_chain_reader, AlloyChainReader};

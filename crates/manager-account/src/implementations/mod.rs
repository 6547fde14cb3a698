pub mod local;

pub use local::{create_account, LocalWallet};

pub mod alloy;

pub use alloy::{create_http_delivery, AlloyDelivery};

// HTTP client for the letter gateway, used by the CLI.

pub mod gateway_client;

pub use gateway_client::{ClientError, GatewayClient};

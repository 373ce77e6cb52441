// Library root: shared by the gateway server (src/main.rs), the `gatectl`
// client and the integration tests.

pub mod config;
pub mod error;
pub mod gateway;
pub mod locale;
pub mod logger;
pub mod session;

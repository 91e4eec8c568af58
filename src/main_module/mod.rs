//! HTTP server and liveness handlers

mod health;
mod server;
mod shutdown;

pub use health::*;
pub use server::*;
pub use shutdown::*;

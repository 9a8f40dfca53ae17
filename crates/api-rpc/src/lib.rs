//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 surface through which the record-management layer
//! submits match requests.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig};

//! Model Context Protocol (MCP) server implementation.
//!
//! This module exposes the showcase data as read-only MCP tools and
//! resources. Clients talk to the server over HTTP using JSON-RPC 2.0
//! messages, one message or a batch per request body.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MCP Server                          │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌────────────────┐   │
//! │   │  Transport  │───▶│   Server    │───▶│ Tools/Resources│   │
//! │   │   (HTTP)    │    │ (dispatch)  │    │   (handlers)   │   │
//! │   └─────────────┘    └─────────────┘    └────────────────┘   │
//! │          │                  │                   │            │
//! │          ▼                  ▼                   ▼            │
//! │   ┌───────────────────────────┐    ┌──────────────────────┐  │
//! │   │     JSON-RPC Messages     │    │    ShowcaseStore     │  │
//! │   └───────────────────────────┘    └──────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{JsonRpcErrorData, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION};
pub use server::{DispatchOutcome, McpServer};
pub use transport::{router, serve};

//! showcase-mcp: read-only MCP server for community project showcase data
//!
//! This library lets AI assistants browse a showcase of community projects
//! and the people who build them through the Model Context Protocol.
//!
//! # Architecture
//!
//! The server only reads. Every request is a query against the data store:
//!
//! - **Tools**: listing, search, lookups and aggregate statistics
//! - **Resources**: every project and profile addressable by URI
//! - **Store**: a PostgREST endpoint in production, or a JSON snapshot
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation and HTTP endpoint
//! - [`store`] — Data store abstraction and implementations

pub mod config;
pub mod error;
pub mod mcp;
pub mod store;

//! Google Drive MCP tool server.
//!
//! Wraps the Drive v3 API as four MCP tools for agent runtimes: create a
//! document, share it, read its content, and extract a file ID from a share
//! link. Credential acquisition (token store, refresh, interactive consent)
//! lives in [`auth`]; the REST adapter in [`drive`]; the MCP surface in
//! [`server`].

pub mod auth;
pub mod content;
pub mod drive;
pub mod error;
pub mod link;
pub mod server;

pub use content::DocContent;
pub use drive::{DriveClient, ReadOutcome};
pub use error::{DriveError, Result};
pub use server::DriveToolServer;

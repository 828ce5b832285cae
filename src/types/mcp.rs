//! MCP (Model Context Protocol) server configuration
//!
//! The agent CLI is pointed at exactly one MCP server per `Invocation`: a
//! stdio server that proxies tool-permission requests to the Broker socket.
//! This module models just that file's shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One entry in `mcpServers`. Always `type: "stdio"` for this crate's use:
/// the agent CLI never talks to a remote or in-process MCP server here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpStdioServerConfig {
    /// Server type, always `"stdio"`.
    #[serde(rename = "type")]
    pub server_type: String,
    /// Command to execute (the `tim` binary re-invoked as the permissions
    /// MCP shim, or a dedicated helper script).
    pub command: String,
    /// Command arguments. The Broker's socket path is always the last one.
    pub args: Vec<String>,
    /// Extra environment variables for the MCP server process, if any.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

impl McpStdioServerConfig {
    /// Build the single `"permissions"` MCP server entry pointing at a
    /// Broker socket.
    #[must_use]
    pub fn permissions_server(command: impl Into<String>, socket_path: impl Into<String>) -> Self {
        Self {
            server_type: "stdio".to_string(),
            command: command.into(),
            args: vec![socket_path.into()],
            env: HashMap::new(),
        }
    }
}

/// The full `--mcp-config` JSON document written to a temp file and passed
/// to the agent CLI: `{"mcpServers": {"permissions": {...}}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfigFile {
    #[serde(rename = "mcpServers")]
    pub mcp_servers: HashMap<String, McpStdioServerConfig>,
}

impl McpConfigFile {
    /// Build the config file contents for a single permissions server.
    #[must_use]
    pub fn with_permissions_server(server: McpStdioServerConfig) -> Self {
        let mut mcp_servers = HashMap::new();
        mcp_servers.insert("permissions".to_string(), server);
        Self { mcp_servers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_expected_shape() {
        let server = McpStdioServerConfig::permissions_server("tim", "/tmp/tim-broker.sock");
        let config = McpConfigFile::with_permissions_server(server);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["mcpServers"]["permissions"]["type"], "stdio");
        assert_eq!(value["mcpServers"]["permissions"]["command"], "tim");
        assert_eq!(
            value["mcpServers"]["permissions"]["args"][0],
            "/tmp/tim-broker.sock"
        );
    }
}

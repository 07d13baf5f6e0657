//! Agent settings loaded from JSON.
//!
//! Settings use the shape
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "filesystem": { "command": "npx", "args": ["-y", "@modelcontextprotocol/server-filesystem", "~"] }
//!   },
//!   "collisionPolicy": "last_wins",
//!   "maxToolCalls": 10,
//!   "requestTimeoutSecs": 30
//! }
//! ```
//!
//! Every top-level key is optional. A key present in the document replaces
//! the default for that key as a whole; `mcpServers` is not merged server by
//! server. Server order follows the document.
//!
//! `mcpServers` keys become server names. Names are trimmed and may only
//! contain ASCII letters, digits, `_`, `-` and `.`, up to 100 characters.
//! A key such as `"my server"` is rejected with [`ConfigError::Server`], and
//! keys that differ only in surrounding whitespace (`" fs"` and `"fs"`) are
//! rejected as duplicates with [`ConfigError::Servers`]. Names must stay
//! safe to embed in namespaced tool names (`<server>__<tool>`).

use crate::tool_registry::{
    adapters::stdio::DEFAULT_REQUEST_TIMEOUT,
    domain::{
        McpServerName, McpServerSpec, McpServersConfig, ParseToolCollisionPolicyError,
        StdioTransportConfig, ToolCollisionPolicy, ToolRegistryDomainError,
    },
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the server configured when the settings omit `mcpServers`.
pub const DEFAULT_SERVER_NAME: &str = "filesystem";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read settings file {path}: {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The document is not valid JSON or has the wrong shape.
    #[error("invalid settings document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A server entry could not be turned into a launch configuration.
    #[error("invalid configuration for MCP server '{name}': {source}")]
    Server {
        /// Key of the offending entry.
        name: String,
        /// Why the entry was rejected.
        source: ServerEntryError,
    },

    /// The server list violated a domain rule.
    #[error(transparent)]
    Servers(#[from] ToolRegistryDomainError),

    /// `collisionPolicy` named an unknown policy.
    #[error(transparent)]
    CollisionPolicy(#[from] ParseToolCollisionPolicyError),
}

/// Why one `mcpServers` entry was rejected.
#[derive(Debug, Error)]
pub enum ServerEntryError {
    /// The key is not a valid server name.
    #[error(transparent)]
    Name(#[from] ToolRegistryDomainError),

    /// The value is not a valid launch configuration.
    #[error(transparent)]
    Transport(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    mcp_servers: Option<Map<String, Value>>,
    collision_policy: Option<String>,
    max_tool_calls: Option<usize>,
    request_timeout_secs: Option<u64>,
}

/// Validated agent settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpAgentSettings {
    servers: McpServersConfig,
    collision_policy: ToolCollisionPolicy,
    max_tool_calls: Option<usize>,
    request_timeout: Duration,
}

impl Default for McpAgentSettings {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            collision_policy: ToolCollisionPolicy::default(),
            max_tool_calls: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

fn default_servers() -> McpServersConfig {
    let mut servers = McpServersConfig::new();
    if let (Ok(name), Ok(transport)) = (
        McpServerName::new(DEFAULT_SERVER_NAME),
        StdioTransportConfig::new("npx"),
    ) {
        let transport = transport.with_args(
            ["-y", "@modelcontextprotocol/server-filesystem", "~"]
                .into_iter()
                .map(str::to_owned),
        );
        if servers.push(McpServerSpec::new(name, transport)).is_err() {
            return McpServersConfig::new();
        }
    }
    servers
}

impl McpAgentSettings {
    /// Reads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and the
    /// errors of [`McpAgentSettings::from_json_str`] otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let contents = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Parses settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is malformed, a server
    /// entry is invalid, or the collision policy is unknown.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_json::from_str(document)?;
        let defaults = Self::default();

        let servers = match raw.mcp_servers {
            Some(entries) => servers_from_entries(entries)?,
            None => defaults.servers,
        };
        let collision_policy = match raw.collision_policy {
            Some(policy) => ToolCollisionPolicy::try_from(policy.as_str())?,
            None => defaults.collision_policy,
        };

        Ok(Self {
            servers,
            collision_policy,
            max_tool_calls: raw.max_tool_calls.or(defaults.max_tool_calls),
            request_timeout: raw
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
        })
    }

    /// Returns the configured servers in document order.
    #[must_use]
    pub const fn servers(&self) -> &McpServersConfig {
        &self.servers
    }

    /// Returns the tool name collision policy.
    #[must_use]
    pub const fn collision_policy(&self) -> ToolCollisionPolicy {
        self.collision_policy
    }

    /// Returns the tool call limit for one run, if any.
    #[must_use]
    pub const fn max_tool_calls(&self) -> Option<usize> {
        self.max_tool_calls
    }

    /// Returns the handshake and request timeout for STDIO servers.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

fn servers_from_entries(entries: Map<String, Value>) -> Result<McpServersConfig, ConfigError> {
    let specs = entries
        .into_iter()
        .map(|(key, value)| {
            server_from_entry(&key, value).map_err(|source| ConfigError::Server { name: key, source })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(McpServersConfig::from_specs(specs)?)
}

fn server_from_entry(key: &str, value: Value) -> Result<McpServerSpec, ServerEntryError> {
    let name = McpServerName::new(key)?;
    let transport: StdioTransportConfig = serde_json::from_value(value)?;
    Ok(McpServerSpec::new(name, transport))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn names(settings: &McpAgentSettings) -> Vec<String> {
        settings
            .servers()
            .names()
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn empty_document_uses_defaults() {
        let settings = McpAgentSettings::from_json_str("{}").expect("settings should parse");

        assert_eq!(settings, McpAgentSettings::default());
        assert_eq!(names(&settings), [DEFAULT_SERVER_NAME]);
        let filesystem = settings
            .servers()
            .iter()
            .next()
            .expect("default server present");
        assert_eq!(filesystem.transport().command(), "npx");
        assert_eq!(
            filesystem.transport().args(),
            ["-y", "@modelcontextprotocol/server-filesystem", "~"]
        );
    }

    #[test]
    fn servers_keep_document_order_and_replace_defaults() {
        let document = r#"{
            "mcpServers": {
                "zeta": { "command": "zeta-server" },
                "alpha": { "command": "alpha-server", "args": ["--stdio"] }
            },
            "maxToolCalls": 10
        }"#;

        let settings = McpAgentSettings::from_json_str(document).expect("settings should parse");

        assert_eq!(names(&settings), ["zeta", "alpha"]);
        assert_eq!(settings.max_tool_calls(), Some(10));
        assert_eq!(settings.collision_policy(), ToolCollisionPolicy::LastWins);
        assert_eq!(settings.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn empty_server_map_configures_no_servers() {
        let settings =
            McpAgentSettings::from_json_str(r#"{"mcpServers": {}}"#).expect("settings should parse");

        assert!(settings.servers().is_empty());
    }

    #[rstest]
    #[case(r#"{"mcpServers": {"bad name": {"command": "x"}}}"#)]
    #[case(r#"{"mcpServers": {"fs": {"command": "   "}}}"#)]
    #[case(r#"{"mcpServers": {"fs": {"args": []}}}"#)]
    fn invalid_server_entries_are_rejected(#[case] document: &str) {
        let result = McpAgentSettings::from_json_str(document);

        assert!(matches!(result, Err(ConfigError::Server { .. })));
    }

    #[test]
    fn keys_equal_after_trimming_are_duplicates() {
        let document = r#"{"mcpServers": {" fs": {"command": "a"}, "fs": {"command": "b"}}}"#;

        let result = McpAgentSettings::from_json_str(document);

        assert!(matches!(
            result,
            Err(ConfigError::Servers(ToolRegistryDomainError::DuplicateServerName(_)))
        ));
    }

    #[test]
    fn unknown_collision_policy_is_rejected() {
        let result = McpAgentSettings::from_json_str(r#"{"collisionPolicy": "first_wins"}"#);

        assert!(matches!(result, Err(ConfigError::CollisionPolicy(_))));
    }

    #[test]
    fn loads_settings_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"mcpServers": {{"search": {{"command": "search-server"}}}}, "collisionPolicy": "namespace-prefix", "requestTimeoutSecs": 5}}"#
        )
        .expect("write settings");

        let settings = McpAgentSettings::load(file.path()).expect("settings should load");

        assert_eq!(names(&settings), ["search"]);
        assert_eq!(settings.collision_policy(), ToolCollisionPolicy::NamespacePrefix);
        assert_eq!(settings.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn missing_file_reports_path() {
        let result = McpAgentSettings::load("/definitely/not/here/settings.json");

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}

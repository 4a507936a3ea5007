//! Shared constants used across the application

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Placeholder credential used until a real key is configured.
pub const DEFAULT_API_KEY: &str = "default-secret-key";

pub const API_KEY_HEADER: &str = "X-API-Key";

pub const ENV_API_BASE: &str = "POLICYCHAT_API_BASE";
pub const ENV_API_KEY: &str = "POLICYCHAT_API_KEY";
pub const ENV_LOG_FILTER: &str = "POLICYCHAT_LOG";

pub const DEFAULT_GREETING: &str = "Hello! I'm your AI HR Assistant. I've indexed your latest company policies. How can I help you today?";

/// Assistant reply synthesized when a chat request cannot be started.
pub const CHAT_ERROR_REPLY: &str = "Sorry, I encountered an error processing your request.";

/// Appended to a partial reply when the stream stops before completion.
pub const STREAM_INTERRUPTED_MARKER: &str = "\n\n[Response interrupted]";

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

//! Common types shared across ports.

use std::collections::HashMap;

/// Free-form key/value context attached to tasks and proposals.
pub type ContextMap = HashMap<String, serde_json::Value>;

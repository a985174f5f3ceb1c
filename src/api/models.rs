//! Request and response bodies of the HTTP surface.
//!
//! `POST /nodes/{name}` takes a [`NodeRequest`]:
//!
//! ```json
//! {
//!   "inputs": { "image_path": "in/photo.jpg" },
//!   "config": { "effect": "sepia", "intensity": 0.8 }
//! }
//! ```
//!
//! and answers with the node's result envelope, `{"status": "success",
//! "outputs": {...}}` or `{"status": "error", "error": "..."}`, always with
//! `200 OK`. Only transport problems (malformed body, unknown node) use
//! error status codes and [`ErrorResponse`].

use serde::{Deserialize, Serialize};

use crate::handlers::{NodeKind, ValueMap};

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct NodeRequest {
    #[serde(default)]
    pub inputs: ValueMap,
    #[serde(default)]
    pub config: ValueMap,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NodeInfo {
    pub name: NodeKind,
    pub description: String,
}

impl From<NodeKind> for NodeInfo {
    fn from(kind: NodeKind) -> Self {
        Self {
            name: kind,
            description: kind.description().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NodeListResponse {
    pub nodes: Vec<NodeInfo>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub nodes: usize,
    pub version: String,
}

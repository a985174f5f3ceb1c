//! Nodes backed by hosted models and local inference runtimes

mod auto_caption;
mod generate_image;
mod remove_object;

pub use auto_caption::AutoCaptionHandler;
pub use generate_image::{is_image_size, GenerateImageHandler};
pub use remove_object::RemoveObjectHandler;

use super::params::Params;
use super::traits::NodeError;

/// API key from the call parameters, else the key loaded from the
/// environment at startup
fn resolve_api_key(
    params: &Params<'_>,
    configured: Option<&str>,
    env_var: &str,
) -> Result<String, NodeError> {
    params
        .string("api_key")?
        .filter(|key| !key.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .ok_or_else(|| NodeError::MissingInput(format!("API key is required (api_key or {env_var})")))
}

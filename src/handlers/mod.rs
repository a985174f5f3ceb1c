//! Node handlers
//!
//! Every node implements [`NodeHandler`] and is reached through the
//! [`NodeRegistry`], which turns any result into an [`Envelope`]:
//!
//! ```rust,ignore
//! use medianode::config::Config;
//! use medianode::handlers::NodeRegistry;
//!
//! let registry = NodeRegistry::from_config(&Config::load()?)?;
//! let envelope = registry.process("resize_image", inputs, config).await;
//! println!("{}", serde_json::to_string(&envelope)?);
//! ```
//!
//! ## Key Components
//!
//! - [`NodeHandler`] - the per-node trait
//! - [`Params`] - inputs-then-config parameter lookup with typed coercion
//! - [`OutputDir`] - unique output path allocation
//! - [`Backends`] - the delegates handlers are wired to

pub mod ai;
pub mod image;
pub mod output;
pub mod params;
mod registry;
#[cfg(test)]
pub(crate) mod testing;
mod traits;
pub mod types;
pub mod validate;
pub mod video;

pub use output::OutputDir;
pub use params::Params;
pub use registry::{Backends, NodeRegistry, NodeSettings, RegistryError};
pub use traits::{ErrorKind, NodeError, NodeHandler};
pub use types::{Envelope, NodeKind, Outputs, ValueMap};

use std::sync::Arc;

use crate::media::{ImageBackend, MediaError};

/// Run a raster operation on the blocking pool
pub(crate) async fn run_blocking<T, F>(backend: &Arc<dyn ImageBackend>, op: F) -> Result<T, NodeError>
where
    T: Send + 'static,
    F: FnOnce(&dyn ImageBackend) -> Result<T, MediaError> + Send + 'static,
{
    let backend = Arc::clone(backend);
    Ok(tokio::task::spawn_blocking(move || op(backend.as_ref())).await??)
}

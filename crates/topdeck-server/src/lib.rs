//! Topdeck production server.
//!
//! This crate provides the production server implementation using:
//! - axum WebSockets for transport
//! - Tokio for async runtime
//! - System time and OS randomness
//!
//! ## Architecture
//!
//! ```text
//! topdeck-server
//!   ├─ SystemEnv          (production Environment impl)
//!   ├─ Gateway            (axum routes, per-connection channels)
//!   ├─ ServerDriver       (Sans-IO orchestrator)
//!   ├─ ConnectionRegistry (live connections)
//!   └─ SessionRegistry    (rooms and matches, from topdeck-core)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod error;
mod registry;
mod server_error;
mod system_env;
mod transport;

use std::path::PathBuf;

pub use driver::{LogLevel, ServerAction, ServerConfig as DriverConfig, ServerDriver, ServerEvent};
pub use error::ServerError;
pub use registry::{ConnectionRegistry, SessionInfo};
pub use server_error::DriverError;
pub use system_env::SystemEnv;
use tokio::net::TcpListener;
use topdeck_core::Catalog;
pub use transport::Gateway;

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:3001")
    pub bind_address: String,
    /// JSON catalog to serve instead of the built-in roster
    pub catalog_path: Option<PathBuf>,
    /// Driver configuration (limits, delivery delays)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
            catalog_path: None,
            driver: DriverConfig::default(),
        }
    }
}

/// Load the configured catalog, or the built-in roster.
///
/// # Errors
///
/// Returns `ServerError::Config` if the file cannot be read or is not a valid
/// catalog.
pub fn load_catalog(path: Option<&std::path::Path>) -> Result<Catalog, ServerError> {
    let Some(path) = path else {
        return Ok(Catalog::builtin()?);
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| ServerError::Config(format!("reading {}: {e}", path.display())))?;
    Ok(Catalog::from_json(&text)?)
}

/// Production topdeck server.
///
/// Wraps `ServerDriver` with the WebSocket gateway and system environment.
pub struct Server {
    /// Routes and connection state
    gateway: Gateway,
    /// Bound listener
    listener: TcpListener,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The catalog cannot be loaded
    /// - Binding to the address fails
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let catalog = load_catalog(config.catalog_path.as_deref())?;
        tracing::info!(
            "serving {} cards with attributes {:?}",
            catalog.len(),
            catalog.attributes()
        );

        let driver = ServerDriver::new(SystemEnv::new(), catalog, config.driver);
        let listener = TcpListener::bind(&config.bind_address).await?;

        Ok(Self { gateway: Gateway::new(driver), listener })
    }

    /// Run the server until it is shut down or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.local_addr()?);
        axum::serve(self.listener, self.gateway.router()).await?;
        Ok(())
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }
}

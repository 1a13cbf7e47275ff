//! The interactive mirror-plot viewer: one loaded dataset, a page to browse it and a
//! small local HTTP server answering the page's requests.
use std::env;

mod session;
#[cfg(feature = "viewer")]
mod server;

pub use session::ViewerSession;
#[cfg(feature = "viewer")]
pub use server::{route, run_server, serve, Response};

/// The environment variable overriding the port the viewer listens on
pub const PORT_ENV_VAR: &str = "MZMIRROR_PORT";
pub const DEFAULT_PORT: u16 = 8050;

/// The port named by `MZMIRROR_PORT`, or 8050 when it is unset or unreadable
pub fn default_port() -> u16 {
    env::var(PORT_ENV_VAR)
        .map(|v| v.trim().parse())
        .unwrap_or(Ok(DEFAULT_PORT))
        .unwrap_or_else(|e| {
            log::warn!("Ignoring {PORT_ENV_VAR}: {e}");
            DEFAULT_PORT
        })
}

//! weekplan serve command implementation
//!
//! The rest of the CLI is synchronous; the server gets its own runtime.

use crate::error::{Error, Result};
use crate::server;

use super::Context;

/// Options for `weekplan serve`
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
}

pub fn run(ctx: Context, options: ServeOptions) -> Result<()> {
    let mut config = ctx.config;
    if let Some(host) = options.host {
        config.server.host = host;
    }
    if let Some(port) = options.port {
        if port == 0 {
            return Err(Error::InvalidArgument("--port must be > 0".to_string()));
        }
        config.server.port = port;
    }

    if !ctx.output.quiet && !ctx.output.json {
        eprintln!(
            "weekplan serving {} on http://{}:{}",
            config.storage().planner_file().display(),
            config.server.host,
            config.server.port
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime
        .block_on(server::serve(config))
        .map_err(|err| Error::OperationFailed(format!("server failed: {err:#}")))
}

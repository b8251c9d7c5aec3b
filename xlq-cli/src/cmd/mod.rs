//! Subcommand handlers. Each handler builds its own argument record from
//! the parsed flags; nothing is shared between invocations except the
//! engine and its immutable sandbox.

pub mod read;
pub mod write;

use anyhow::{Context, Result};
use xlq_core::{Engine, Sandbox};

/// Build the engine for ordinary commands: sandbox over the working
/// directory plus the basepath when one is set.
pub fn engine_for(basepath: Option<&str>) -> Result<Engine> {
    let extras: Vec<String> = basepath
        .filter(|b| !b.is_empty())
        .map(|b| b.to_string())
        .into_iter()
        .collect();
    let sandbox = Sandbox::initialize(extras).context("initialize path sandbox")?;
    Ok(Engine::new(sandbox))
}

/// Build the engine for server mode: the allow-list additionally takes the
/// `--allowed-paths` flag and the `XLQ_ALLOWED_PATHS` environment variable
/// (platform list separator).
pub fn engine_for_server(basepath: Option<&str>, allowed_paths: &[String]) -> Result<Engine> {
    let mut extras: Vec<String> = Vec::new();
    extras.extend(allowed_paths.iter().cloned());
    if let Some(base) = basepath.filter(|b| !b.is_empty()) {
        extras.push(base.to_string());
    }
    if extras.is_empty() {
        if let Ok(env_paths) = std::env::var("XLQ_ALLOWED_PATHS") {
            let sep = if cfg!(windows) { ';' } else { ':' };
            extras.extend(
                env_paths
                    .split(sep)
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            );
        }
    }
    let sandbox = Sandbox::initialize(extras).context("initialize path sandbox")?;
    Ok(Engine::new(sandbox))
}

/// Run the stdio tool server until the client disconnects.
pub fn mcp(basepath: Option<&str>, allowed_paths: &[String]) -> Result<()> {
    let engine = engine_for_server(basepath, allowed_paths)?;
    let allowed: Vec<String> = engine
        .sandbox()
        .allowed_paths()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    eprintln!("xlq tool server allowed paths: {}", allowed.join(", "));
    xlq_mcp::serve(&engine)
}

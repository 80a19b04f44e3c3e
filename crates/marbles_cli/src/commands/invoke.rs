//! Invoke command implementation.

use super::state;
use marbles_core::{Config, Function, Invocation, MarblesContract, Response};
use std::path::Path;
use tracing::info;

/// Parses a `key=json` transient argument.
pub fn parse_transient(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=json, got {arg:?}")),
    }
}

/// Runs one invocation against the state file and returns its payload.
///
/// The invocation executes inside a store transaction. The state file is
/// rewritten only when a mutation commits.
pub fn execute(
    path: &Path,
    invocation: &Invocation,
    config: Config,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let function: Function = invocation.function.parse()?;
    let store = state::load(path)?;
    let contract = MarblesContract::new(config);

    let payload = store
        .transaction(|txn| contract.execute(txn, invocation))
        .map_err(|e| Response::error(e.to_string()).error_json())?;

    if function.is_mutation() {
        state::save(path, &store)?;
        info!(%function, "committed");
    }
    Ok(payload)
}

/// Runs the invoke command.
pub fn run(
    path: &Path,
    function: String,
    args: Vec<String>,
    transient: Vec<(String, String)>,
    config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let invocation = transient.into_iter().fold(
        Invocation::new(function).args(args),
        |invocation, (key, value)| invocation.transient(key, value),
    );

    let payload = execute(path, &invocation, config)?;
    if !payload.is_empty() {
        println!("{}", String::from_utf8_lossy(&payload));
    }
    Ok(())
}

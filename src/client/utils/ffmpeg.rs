use super::*;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::instrument;

/// Runs `program` with `args` and waits for it to exit.
///
/// stdin is closed so a tool that wants to prompt (e.g. before overwriting a
/// file) fails instead of hanging. With a `timeout` the child is killed once
/// the limit is reached.
#[instrument(skip(args, timeout), fields(arg_count = args.len()))]
pub(crate) async fn run_tool(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<CommandResult> {
    debug!("Running command: {} {}", program, args.join(" "));
    let start_time = Instant::now();

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| WrapperError::Process {
            program: program.to_string(),
            source,
        })?;

    let output = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| WrapperError::Timeout {
                program: program.to_string(),
                timeout,
            })?,
        None => child.wait_with_output().await,
    }
    .map_err(|source| WrapperError::Process {
        program: program.to_string(),
        source,
    })?;

    let result = CommandResult::from(output);
    info!(
        "{} exited with status {} after {:?}",
        program,
        result.status,
        start_time.elapsed()
    );
    if !result.success() {
        error!(
            "{} failed with exit code {}: {}",
            program,
            result.status,
            result.stderr.trim()
        );
        return Err(result.into_error(program));
    }
    Ok(result)
}

//! `dispatchd` binary: serves a built-in `echo` handler.
//!
//! In background mode the launching process prints the serving child's pid
//! and exits immediately.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use dispatchd::{HandlerError, HandlerRegistry, Launch, run_server};
use serde_json::{Value, json};

fn main() -> ExitCode {
    let application = HandlerRegistry::new().with_handler("echo", echo);
    match run_server(Arc::new(application)) {
        Ok(Launch::Detached { child }) => match writeln!(io::stdout(), "{child}") {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        },
        Ok(Launch::Stopped) => ExitCode::SUCCESS,
        Err(error) => {
            // stderr may already be closed; the exit code still reports failure.
            writeln!(io::stderr(), "dispatchd: {error}").ok();
            ExitCode::FAILURE
        }
    }
}

/// Answers `{"name": N}` with `{"echoed": N}`.
fn echo(event: &Value, _context: &Value, output: &mut dyn Write) -> Result<Value, HandlerError> {
    let name = event.get("name").cloned().unwrap_or(Value::Null);
    writeln!(output, "echo handler invoked")?;
    Ok(json!({ "echoed": name }))
}

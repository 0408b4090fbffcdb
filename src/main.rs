mod calc;
mod config;
mod db;
mod ipc;

use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(directive: &str) {
    // stdout carries the protocol, so logs go to stderr.
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn reply_line(out: &mut impl Write, reply: &serde_json::Value) -> io::Result<()> {
    serde_json::to_writer(&mut *out, reply)?;
    out.write_all(b"\n")?;
    out.flush()
}

fn main() -> anyhow::Result<()> {
    let settings = config::Settings::load()?;
    init_tracing(&settings.log);

    let mut state = ipc::AppState::new(settings.db_file.clone());
    if let Some(path) = settings.workspace.as_deref() {
        match state.open_workspace(path) {
            Ok(()) => info!(workspace = %path.display(), "opened workspace from config"),
            Err(e) => {
                warn!(workspace = %path.display(), error = %e, "could not open configured workspace")
            }
        }
    }

    let mut stdout = io::stdout().lock();
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                warn!(error = %e, "malformed request line");
                ipc::bad_json(e.to_string())
            }
        };
        if let Err(e) = reply_line(&mut stdout, &reply) {
            debug!(error = %e, "stdout closed");
            break;
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}

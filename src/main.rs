use anyhow::Context;
use clap::Parser;
use classbookd::config::{Cli, Config, LOG_ENV};
use classbookd::ipc;
use classbookd::remote::RemoteEvent;
use classbookd::session::Session;
use log::{debug, info};
use serde_json::json;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};

enum Wake {
    Line(std::io::Result<Option<String>>),
    Remote(Option<RemoteEvent>),
    PushDue,
}

async fn push_timer(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

async fn write_line(stdout: &mut Stdout, value: &serde_json::Value) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(value).unwrap_or_else(|_| "{\"ok\":false}".to_string());
    line.push('\n');
    stdout
        .write_all(line.as_bytes())
        .await
        .context("failed to write stdout")?;
    stdout.flush().await.context("failed to flush stdout")?;
    Ok(())
}

async fn run(config: Config) -> anyhow::Result<()> {
    let mut session = Session::from_config(&config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    info!(
        "classbookd {} ready (remote: {})",
        env!("CARGO_PKG_VERSION"),
        config.remote
    );

    loop {
        let deadline = session.push_deadline();
        let wake = tokio::select! {
            line = lines.next_line() => Wake::Line(line),
            event = session.next_remote_event() => Wake::Remote(event),
            _ = push_timer(deadline) => Wake::PushDue,
        };

        match wake {
            Wake::Line(line) => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let resp = match serde_json::from_str::<ipc::Request>(&line) {
                    Ok(req) => {
                        debug!("request {} {}", req.id, req.method);
                        ipc::handle_request(&mut session, req)
                    }
                    // Can't reply without id.
                    Err(e) => json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    }),
                };
                write_line(&mut stdout, &resp).await?;
            }
            Wake::Remote(Some(event)) => session.handle_remote(event, Instant::now()),
            Wake::Remote(None) => {}
            Wake::PushDue => session.flush_due(Instant::now()),
        }

        for event in session.take_events() {
            write_line(&mut stdout, &event).await?;
        }
    }

    info!("stdin closed, exiting");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_cli(Cli::parse(), std::env::var(LOG_ENV).ok());
    env_logger::Builder::new()
        .parse_filters(&config.log_filter)
        .target(env_logger::Target::Stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(run(config))
}

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use invox::backend::HttpBackend;
use invox::config::Config;
use invox::engine::{Channel, ConsoleEngine, RecognitionError, RecognitionEvent};
use invox::pipeline::{Pipeline, PipelineEvent};
use invox::render::ConsoleRender;

#[derive(Parser)]
#[command(name = "invox", about = "Asistente de voz para inventario")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Process a single command and exit
    #[arg(long)]
    command: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config);
    info!(backend = %config.backend.base_url, "starting voice assistant");

    let (tx, rx) = mpsc::unbounded_channel::<PipelineEvent>();
    let backend = HttpBackend::new(&config.backend.base_url);
    let (console_engine, active_channel) = ConsoleEngine::new(tx.clone());
    let pipeline = Pipeline::new(config, backend, console_engine, ConsoleRender, tx.clone());

    if let Some(command) = cli.command {
        let _ = tx.send(PipelineEvent::Command(command));
        let _ = tx.send(PipelineEvent::Shutdown);
        pipeline.run(rx).await;
        return Ok(());
    }

    // Bridge typed lines into recognition events. A line goes to
    // whichever channel is "recording"; with no session active it is
    // treated as an example command.
    let stdin_tx = tx.clone();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if let Some(event) = parse_line(&line, &active_channel) {
                let stop = event == PipelineEvent::Shutdown;
                let command_capture = matches!(
                    &event,
                    PipelineEvent::Recognition(RecognitionEvent::Transcript(Channel::Command, _))
                );
                if stdin_tx.send(event).is_err() || stop {
                    return;
                }
                // a one-shot command capture ends after its result; the
                // continuous wake session stays up
                if command_capture {
                    *active_channel.lock().unwrap() = None;
                    let _ = stdin_tx.send(PipelineEvent::Recognition(
                        RecognitionEvent::SessionEnd(Channel::Command),
                    ));
                }
            }
        }
        let _ = stdin_tx.send(PipelineEvent::Shutdown);
    });

    pipeline.run(rx).await;
    Ok(())
}

fn parse_line(line: &str, active: &Arc<Mutex<Option<Channel>>>) -> Option<PipelineEvent> {
    if let Some(rest) = line.strip_prefix('/') {
        let mut parts = rest.splitn(2, ' ');
        let cmd = parts.next().unwrap_or_default();
        let arg = parts.next().unwrap_or_default().trim();
        return match cmd {
            "confirmar" => Some(PipelineEvent::Confirm),
            "cancelar" => Some(PipelineEvent::Cancel),
            "seleccionar" => arg.parse().ok().map(PipelineEvent::SelectProduct),
            "info" => Some(PipelineEvent::more_info(arg)),
            "listar" => Some(PipelineEvent::list_all()),
            // inject an engine failure, e.g. "/error not-allowed"
            "error" => {
                let channel = active.lock().unwrap().unwrap_or(Channel::Command);
                Some(PipelineEvent::Recognition(RecognitionEvent::Error(
                    channel,
                    RecognitionError::from_code(arg),
                )))
            }
            "salir" => Some(PipelineEvent::Shutdown),
            _ => None,
        };
    }

    let channel = *active.lock().unwrap();
    match channel {
        Some(channel) => Some(PipelineEvent::Recognition(RecognitionEvent::Transcript(
            channel,
            line.to_string(),
        ))),
        None => Some(PipelineEvent::Command(line.to_string())),
    }
}

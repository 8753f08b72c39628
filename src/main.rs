// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use midi_relay::midi::{open_output, print_destinations, ChannelMessage};
use midi_relay::server::serve;
use midi_relay::{MemoryOutput, MidiService, OutputSink, ServerConfig};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("midi-relay - MIDI output over the network");
    println!();
    println!("Usage: midi-relay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <PATH>   Load settings from a YAML file");
    println!("  --dry-run         Serve without a MIDI port, logging messages instead");
    println!("  --list-midi       List available MIDI destinations (outputs)");
    println!("  --test-note       Send a test note to the configured output and exit");
    println!("  --help            Show this help message");
    println!();
    println!("Environment:");
    println!("  PORT              Listen port (default 8000)");
    println!("  MIDI_RELAY_HOST   Listen host (default 127.0.0.1)");
    println!("  MIDI_OUTPUT_PORT  Output port name to match (default \"MIDI Relay Out\")");
    println!("  MIDI_RELAY_CONFIG Config file path, if --config is not given");
    println!("  RUST_LOG          Log filter (default info)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Serve,
    DryRun,
    ListMidi,
    TestNote,
    Help,
}

struct Options {
    mode: Mode,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options {
        mode: Mode::Serve,
        config: None,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config = Some(PathBuf::from(path));
            }
            "--dry-run" => options.mode = Mode::DryRun,
            "--list-midi" => options.mode = Mode::ListMidi,
            "--test-note" => options.mode = Mode::TestNote,
            "--help" | "-h" => options.mode = Mode::Help,
            other => return Err(anyhow!("Unknown option: {}", other)),
        }
    }

    Ok(options)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn send_test_note(config: &ServerConfig) -> Result<()> {
    let sink = OutputSink::new(open_output(&config.output)?);

    let channel = 0; // MIDI channel 1
    let note = 60; // Middle C
    let velocity = 100;

    println!("Sending test note (Middle C, velocity {})...", velocity);
    sink.send(&ChannelMessage::NoteOn { channel, note, velocity }.to_bytes())?;
    println!("Note On sent");

    tokio::time::sleep(Duration::from_millis(500)).await;

    sink.send(&ChannelMessage::NoteOff { channel, note, velocity: 0 }.to_bytes())?;
    println!("Note Off sent");

    sink.close();
    println!("Test complete!");
    Ok(())
}

async fn run_server(config: &ServerConfig, sink: OutputSink) -> Result<()> {
    let host = config.server.host.as_str();
    let port = config.server.port;
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;

    let service = MidiService::new(sink.clone());
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    let served = serve(listener, service, shutdown).await;
    sink.close();
    served.context("Listener failed")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    match options.mode {
        Mode::Help => {
            print_usage();
            return Ok(());
        }
        Mode::ListMidi => {
            print_destinations();
            return Ok(());
        }
        _ => {}
    }

    init_logging();
    let config = ServerConfig::from_startup(options.config.as_deref())?;

    match options.mode {
        Mode::TestNote => send_test_note(&config).await,
        Mode::DryRun => {
            info!("Dry run: MIDI messages are logged, not sent");
            run_server(&config, OutputSink::new(MemoryOutput::echo_only())).await
        }
        _ => {
            let output = match open_output(&config.output) {
                Ok(output) => output,
                Err(e) => {
                    error!("Could not open a MIDI output: {:#}", e);
                    std::process::exit(1);
                }
            };
            run_server(&config, OutputSink::new(output)).await
        }
    }
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! TCP listener.
//!
//! Accepts connections until the shutdown future resolves. Each connection
//! gets its own task; requests on one connection are answered in order.

use std::future::Future;
use std::io;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::protocol::handle_bytes;
use super::MidiService;

/// Serve requests from `listener` until `shutdown` completes
pub async fn serve<F>(listener: TcpListener, service: MidiService, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()>,
{
    info!(addr = %listener.local_addr()?, "Listening for requests");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Listener shutting down");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                debug!(%peer, "Client connected");
                let service = service.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, service).await {
                        debug!(%peer, "Connection closed with error: {}", e);
                    } else {
                        debug!(%peer, "Client disconnected");
                    }
                });
            }
        }
    }

    Ok(())
}

async fn handle_connection(stream: TcpStream, service: MidiService) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        // Raw bytes so that a line with bad UTF-8 gets a parse error reply
        let response = handle_bytes(&service, &line).await;
        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
    }

    Ok(())
}

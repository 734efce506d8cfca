// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge ingress: reads newline-delimited JSON events the runtime
//! container writes to a per-tenant Unix domain socket. Deliberately does
//! not know about the bus or control process — it just hands parsed
//! events to a channel; the worker wires those to
//! `nexus_bus::nats::Publisher`.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A single bridge-observed event, already tagged with its tenant.
#[derive(Debug, Clone)]
pub struct BridgeEvent {
    pub tenant_id: String,
    pub event_type: String,
    pub payload: Value,
}

/// Wraps a raw JSON line from the bridge socket before it is known to be
/// well-formed.
#[derive(serde::Deserialize)]
struct RawLine {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    payload: Value,
}

/// Listens on a tenant's bridge socket and forwards parsed lines to `tx`.
pub struct BridgeListener {
    tenant_id: String,
    socket_path: PathBuf,
}

impl BridgeListener {
    pub fn new(tenant_id: impl Into<String>, socket_path: impl Into<PathBuf>) -> Self {
        Self { tenant_id: tenant_id.into(), socket_path: socket_path.into() }
    }

    /// Bind the socket (removing any stale file left by a prior run) and
    /// accept connections until `shutdown` fires. Each accepted connection
    /// is read line-by-line; malformed lines are logged and skipped so one
    /// bad line cannot wedge the whole bridge.
    pub async fn run(self, tx: mpsc::Sender<BridgeEvent>, shutdown: CancellationToken) -> std::io::Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(&self.socket_path)?;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    let (stream, _addr) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            warn!(tenant_id = %self.tenant_id, error = %err, "bridge accept failed");
                            continue;
                        }
                    };
                    let tenant_id = self.tenant_id.clone();
                    let tx = tx.clone();
                    let conn_shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        read_connection(tenant_id, stream, tx, conn_shutdown).await;
                    });
                }
            }
        }
    }
}

async fn read_connection(
    tenant_id: String,
    stream: tokio::net::UnixStream,
    tx: mpsc::Sender<BridgeEvent>,
    shutdown: CancellationToken,
) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => return,
            next = lines.next_line() => next,
        };
        let line = match next {
            Ok(Some(line)) if !line.trim().is_empty() => line,
            Ok(Some(_)) => continue,
            Ok(None) => return,
            Err(err) => {
                warn!(%tenant_id, error = %err, "bridge connection read error");
                return;
            }
        };

        let raw: RawLine = match serde_json::from_str(&line) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%tenant_id, error = %err, "dropping malformed bridge line");
                continue;
            }
        };
        debug!(%tenant_id, event_type = %raw.event_type, "bridge event received");
        let event = BridgeEvent { tenant_id: tenant_id.clone(), event_type: raw.event_type, payload: raw.payload };
        if tx.send(event).await.is_err() {
            return;
        }
    }
}

/// Write a single newline-delimited JSON line to a bridge socket. Used by
/// tests and by the runtime-side client, which is out of scope here but
/// shares this encoding.
pub fn encode_line(event_type: &str, payload: &Value) -> String {
    format!("{}\n", serde_json::json!({"type": event_type, "payload": payload}))
}

pub fn default_socket_dir() -> &'static Path {
    Path::new("/var/run/nexus")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixStream;

    #[tokio::test]
    async fn forwards_well_formed_lines_and_skips_malformed() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let socket_path = tmp.path().join("bridge.sock");
        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();

        let listener = BridgeListener::new("t_1", socket_path.clone());
        let server_shutdown = shutdown.clone();
        let server = tokio::spawn(async move { listener.run(tx, server_shutdown).await });

        // Give the listener a moment to bind.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let mut client = UnixStream::connect(&socket_path).await.expect("connect");
        client.write_all(encode_line("whatsapp.qr", &serde_json::json!({"qr": "abc"})).as_bytes()).await.expect("write");
        client.write_all(b"not json\n").await.expect("write");
        client.write_all(encode_line("whatsapp.link_status", &serde_json::json!({"linked": true})).as_bytes()).await.expect("write");
        client.flush().await.expect("flush");

        let first = rx.recv().await.expect("first event");
        assert_eq!(first.event_type, "whatsapp.qr");
        let second = rx.recv().await.expect("second event");
        assert_eq!(second.event_type, "whatsapp.link_status");

        shutdown.cancel();
        drop(client);
        let _ = server.await;
    }
}

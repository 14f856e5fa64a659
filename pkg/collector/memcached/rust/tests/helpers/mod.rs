// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const HEADER_LEN: usize = 24;
const STATUS_UNKNOWN_COMMAND: u16 = 0x0081;

/// Stats lines served per subcommand (`""`, `"slabs"`, `"items"`), written
/// exactly as a text server would send them, e.g. `STAT cmd_get 10`.
#[derive(Debug, Default, Clone)]
pub struct Stats {
    blocks: HashMap<String, Vec<String>>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, subcommand: &str, line: &str) -> Self {
        self.blocks
            .entry(subcommand.to_string())
            .or_default()
            .push(line.to_string());
        self
    }

    /// Declare a subcommand that answers with no stats at all.
    pub fn empty(mut self, subcommand: &str) -> Self {
        self.blocks.entry(subcommand.to_string()).or_default();
        self
    }

    /// A server reporting one stat in each of the three blocks.
    pub fn minimal() -> Self {
        Self::new()
            .line("", "STAT pid 42")
            .line("slabs", "STAT active_slabs 0")
            .line("items", "STAT items:1:number 0")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Text,
    Binary,
}

/// A memcached stand-in on `127.0.0.1`, answering one `stats` request per
/// connection. Stops accepting when dropped.
pub struct StubServer {
    port: u16,
    task: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(protocol: Protocol, stats: Stats) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let stats = Arc::new(stats);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let stats = Arc::clone(&stats);
                tokio::spawn(async move {
                    let _ = match protocol {
                        Protocol::Text => serve_text(stream, &stats).await,
                        Protocol::Binary => serve_binary(stream, &stats).await,
                    };
                });
            }
        });
        Self { port, task }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_text(mut stream: TcpStream, stats: &Stats) -> std::io::Result<()> {
    let mut request = String::new();
    BufReader::new(&mut stream).read_line(&mut request).await?;
    let subcommand = request
        .trim()
        .strip_prefix("stats")
        .unwrap_or_default()
        .trim();

    let reply = match stats.blocks.get(subcommand) {
        Some(lines) => {
            let mut reply: String = lines.iter().map(|l| format!("{l}\r\n")).collect();
            reply.push_str("END\r\n");
            reply
        }
        None => "ERROR\r\n".to_string(),
    };
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}

async fn serve_binary(mut stream: TcpStream, stats: &Stats) -> std::io::Result<()> {
    let mut header = [0u8; HEADER_LEN];
    stream.read_exact(&mut header).await?;
    let key_len = usize::from(u16::from_be_bytes([header[2], header[3]]));
    let extras_len = usize::from(header[4]);
    let body_len = u32::from_be_bytes([header[8], header[9], header[10], header[11]]) as usize;
    let mut body = vec![0u8; body_len];
    stream.read_exact(&mut body).await?;
    let subcommand = String::from_utf8_lossy(&body[extras_len..extras_len + key_len]).to_string();

    let mut reply = Vec::new();
    match stats.blocks.get(&subcommand) {
        Some(lines) => {
            for line in lines {
                // Lines the binary protocol cannot carry are not sent.
                let Some((key, value)) = line
                    .strip_prefix("STAT ")
                    .and_then(|rest| rest.split_once(' '))
                else {
                    continue;
                };
                reply.extend(packet(0, key.as_bytes(), value.as_bytes()));
            }
            reply.extend(packet(0, b"", b""));
        }
        None => reply.extend(packet(STATUS_UNKNOWN_COMMAND, b"", b"Unknown command")),
    }
    stream.write_all(&reply).await?;
    stream.shutdown().await
}

/// One STAT response packet.
fn packet(status: u16, key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut buf = vec![0x81, 0x10];
    buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
    buf.extend_from_slice(&[0, 0]); // extras length, data type
    buf.extend_from_slice(&status.to_be_bytes());
    buf.extend_from_slice(&((key.len() + value.len()) as u32).to_be_bytes());
    buf.extend_from_slice(&[0u8; 12]); // opaque, cas
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
    buf
}

/// A local port nobody listens on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Run `memcached-check --once` against `config` and wait for it to exit.
pub async fn run_once(config: &Path) -> Output {
    let bin = env!("CARGO_BIN_EXE_memcached-check");
    let config = config.to_path_buf();
    tokio::task::spawn_blocking(move || {
        Command::new(bin)
            .arg("--once")
            .arg("--config")
            .arg(&config)
            .env_remove("DD_LOG_LEVEL")
            .output()
            .expect("failed to run memcached-check")
    })
    .await
    .unwrap()
}

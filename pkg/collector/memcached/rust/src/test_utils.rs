// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! In-process memcached stand-ins for unit tests.
#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::protocol::binary::{self, HEADER_LEN, Header, STATUS_OK, STATUS_UNKNOWN_COMMAND};

enum Behavior {
    Text(HashMap<String, String>),
    Binary(HashMap<String, Vec<(String, String)>>),
    Raw(Vec<u8>),
    Silent,
}

/// A listener on `127.0.0.1` answering one request per connection.
/// The accept loop is aborted when the server is dropped.
pub struct FakeServer {
    port: u16,
    task: JoinHandle<()>,
}

impl FakeServer {
    /// Text protocol server; `replies` maps a subcommand to its full reply.
    /// Unknown subcommands get `ERROR`.
    pub async fn text(replies: &[(&str, &str)]) -> Self {
        let replies = replies
            .iter()
            .map(|(s, r)| (s.to_string(), r.to_string()))
            .collect();
        Self::start(Behavior::Text(replies)).await
    }

    /// Binary protocol server fed with `(subcommand, key, value)` triples.
    pub async fn binary(stats: &[(&str, &str, &str)]) -> Self {
        let mut by_subcommand: HashMap<String, Vec<(String, String)>> = HashMap::new();
        for (subcommand, key, value) in stats {
            by_subcommand
                .entry(subcommand.to_string())
                .or_default()
                .push((key.to_string(), value.to_string()));
        }
        Self::start(Behavior::Binary(by_subcommand)).await
    }

    /// Reads the request, writes `bytes`, then closes the connection.
    pub async fn raw(bytes: Vec<u8>) -> Self {
        Self::start(Behavior::Raw(bytes)).await
    }

    /// Accepts connections and never answers.
    pub async fn silent() -> Self {
        Self::start(Behavior::Silent).await
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    async fn start(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let behavior = Arc::new(behavior);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let behavior = Arc::clone(&behavior);
                tokio::spawn(async move {
                    let _ = serve(stream, &behavior).await;
                });
            }
        });
        Self { port, task }
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut stream: TcpStream, behavior: &Behavior) -> std::io::Result<()> {
    match behavior {
        Behavior::Text(replies) => {
            let mut reader = BufReader::new(&mut stream);
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            let subcommand = line.trim().strip_prefix("stats").unwrap_or("").trim();
            let reply = replies
                .get(subcommand)
                .map(String::as_str)
                .unwrap_or("ERROR\r\n");
            stream.write_all(reply.as_bytes()).await?;
        }
        Behavior::Binary(stats) => {
            let mut raw = [0u8; HEADER_LEN];
            stream.read_exact(&mut raw).await?;
            let header = Header::decode(raw);
            let mut body = vec![0u8; header.body_len as usize];
            stream.read_exact(&mut body).await?;
            let start = usize::from(header.extras_len);
            let key = String::from_utf8_lossy(&body[start..start + usize::from(header.key_len)]);

            let mut out = Vec::new();
            match stats.get(key.as_ref()) {
                Some(pairs) => {
                    for (k, v) in pairs {
                        out.extend(binary::response(STATUS_OK, k.as_bytes(), v.as_bytes()));
                    }
                    out.extend(binary::response(STATUS_OK, b"", b""));
                }
                None => out.extend(binary::response(
                    STATUS_UNKNOWN_COMMAND,
                    b"",
                    b"Unknown command",
                )),
            }
            stream.write_all(&out).await?;
        }
        Behavior::Raw(bytes) => {
            // Consume the request so closing does not reset the connection.
            let mut request = [0u8; 64];
            let _ = stream.read(&mut request).await?;
            stream.write_all(bytes).await?;
        }
        Behavior::Silent => {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    }
    stream.shutdown().await
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Client side of the memcached `stats` request.
//!
//! Two transports answer the same request: the line-oriented text protocol
//! and the binary protocol. Both return a [`StatBlock`] with the same keys
//! and values, so nothing downstream knows which one was used.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::time;

use crate::errors::FetchError;
use crate::stats::StatBlock;

pub mod binary;
pub mod text;

/// The stats categories queried on every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subcommand {
    General,
    Slabs,
    Items,
}

impl Subcommand {
    pub const ALL: [Subcommand; 3] = [Subcommand::General, Subcommand::Slabs, Subcommand::Items];

    /// Argument sent after `stats`; empty for the general block.
    pub fn as_str(self) -> &'static str {
        match self {
            Subcommand::General => "",
            Subcommand::Slabs => "slabs",
            Subcommand::Items => "items",
        }
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Text,
    Binary,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Text => write!(f, "text"),
            TransportKind::Binary => write!(f, "binary"),
        }
    }
}

/// Fetches stats blocks from one server.
///
/// Every call opens its own connection, which is dropped as soon as the
/// block has been read or the call fails.
#[derive(Debug, Clone)]
pub struct Client {
    endpoint: Endpoint,
    transport: TransportKind,
    timeout: Duration,
}

impl Client {
    pub fn new(endpoint: Endpoint, transport: TransportKind, timeout: Duration) -> Self {
        Self {
            endpoint,
            transport,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub async fn fetch_stats(&self, subcommand: Subcommand) -> Result<StatBlock, FetchError> {
        let stream = self.connect().await?;
        match self.transport {
            TransportKind::Text => {
                self.bounded(text::fetch(stream, &self.endpoint, subcommand))
                    .await
            }
            TransportKind::Binary => {
                self.bounded(binary::fetch(stream, &self.endpoint, subcommand))
                    .await
            }
        }
    }

    async fn connect(&self) -> Result<TcpStream, FetchError> {
        let addr = (self.endpoint.host.as_str(), self.endpoint.port);
        time::timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| self.timed_out())?
            .map_err(|source| FetchError::Connect {
                endpoint: self.endpoint.clone(),
                source,
            })
    }

    async fn bounded<F>(&self, exchange: F) -> Result<StatBlock, FetchError>
    where
        F: Future<Output = Result<StatBlock, FetchError>>,
    {
        time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| self.timed_out())?
    }

    fn timed_out(&self) -> FetchError {
        FetchError::Timeout {
            endpoint: self.endpoint.clone(),
            timeout: self.timeout,
        }
    }
}

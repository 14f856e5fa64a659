// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::{Endpoint, Subcommand};

/// Failure while fetching one stats block from a server.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("could not connect to {endpoint}: {source}")]
    Connect {
        endpoint: Endpoint,
        source: std::io::Error,
    },
    #[error("timed out talking to {endpoint} after {}ms", timeout.as_millis())]
    Timeout { endpoint: Endpoint, timeout: Duration },
    #[error("i/o error talking to {endpoint}: {source}")]
    Io {
        endpoint: Endpoint,
        source: std::io::Error,
    },
    #[error("{endpoint} closed the connection before the end of `stats {subcommand}`")]
    UnexpectedEof {
        endpoint: Endpoint,
        subcommand: Subcommand,
    },
    #[error("{endpoint} rejected `stats {subcommand}`: {message}")]
    Server {
        endpoint: Endpoint,
        subcommand: Subcommand,
        message: String,
    },
    #[error("malformed response from {endpoint}: {context}")]
    Protocol { endpoint: Endpoint, context: String },
}

impl FetchError {
    /// Whether the failure means the server itself is unusable for this
    /// cycle, as opposed to a single subcommand being refused.
    pub fn is_connection(&self) -> bool {
        !matches!(self, FetchError::Server { .. })
    }

    pub fn endpoint(&self) -> &Endpoint {
        match self {
            FetchError::Connect { endpoint, .. }
            | FetchError::Timeout { endpoint, .. }
            | FetchError::Io { endpoint, .. }
            | FetchError::UnexpectedEof { endpoint, .. }
            | FetchError::Server { endpoint, .. }
            | FetchError::Protocol { endpoint, .. } => endpoint,
        }
    }
}

/// A stats line that does not have the `STAT <key> <value>` shape.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("stats line has no value: {line:?}")]
    MissingValue { line: String },
    #[error("stats line has no key: {line:?}")]
    MissingKey { line: String },
    #[error("unexpected line in stats response: {line:?}")]
    UnexpectedLine { line: String },
    #[error("stats line is not valid UTF-8: {line:?}")]
    NotUtf8 { line: String },
}

/// A raw stat value that cannot be read as the requested number type.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValueError {
    #[error("{value:?} is not an integer")]
    NotInteger { value: String },
    #[error("{value:?} is not a number")]
    NotFloat { value: String },
}

/// An instance block that cannot be turned into an `InstanceConfig`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("port {port} is out of range (1-65535)")]
    InvalidPort { port: i64 },
    #[error("filter `{key}` must map to a type name string")]
    InvalidFilter { key: String },
    #[error("`{key}` has an invalid value: {reason}")]
    InvalidValue { key: String, reason: String },
}

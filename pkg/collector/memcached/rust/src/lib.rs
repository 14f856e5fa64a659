// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
// Panicking code
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]

pub mod check;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod filter;
pub mod parser;
pub mod protocol;
pub mod sink;
pub mod stats;
pub mod synthetic;
pub mod value;

#[cfg(test)]
pub(crate) mod test_utils;

pub use anyhow::{Result, anyhow, bail};

// Re-export the public API
pub use check::{CycleSummary, MemcachedCheck};
pub use config::{Global, InstanceConfig, Registry, RegistryBuilder};
pub use errors::{ConfigError, FetchError, ParseError, ValueError};
pub use protocol::{Client, Endpoint, Subcommand, TransportKind};
pub use stats::{StatBlock, StatSnapshot};
pub use value::StatValue;

/// Plugin name reported on every dispatched record.
pub const PLUGIN_NAME: &str = "memcached";

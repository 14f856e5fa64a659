// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Check configuration and the instance registry.
//!
//! The file layout follows the agent's check configuration:
//!
//! ```yaml
//! init_config:
//!   timeout: 5
//!   transport: text
//! instances:
//!   - host: 127.0.0.1
//!     port: 11211
//!     instance: cache-a
//!     filter_cmd_get: counter
//!     filter_slab_size: bytes
//! ```
//!
//! Instance keys are case-insensitive. Every `filter_<suffix>: <type>` entry
//! adds a row to that instance's filter table.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::errors::ConfigError;
use crate::filter::FilterTable;
use crate::protocol::{Client, Endpoint, TransportKind};

const FILTER_PREFIX: &str = "filter_";

pub mod defaults {
    use std::time::Duration;

    pub const HOST: &str = "localhost";
    pub const PORT: u16 = 11211;
    pub const TIMEOUT: Duration = Duration::from_secs(10);
    pub const MAX_CONCURRENT_INSTANCES: usize = 4;
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct Global {
    #[serde(default)]
    pub init_config: Option<Init>,
    #[serde(default)]
    pub instances: Vec<Instance>,
    /// Sections this check does not read, such as `logs`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Global {
    pub fn init(&self) -> Init {
        self.init_config.clone().unwrap_or_default()
    }

    /// Whether `init_config` or any instance turns verbose logging on.
    /// Readable before the registry is built, so the logger can be set up first.
    pub fn verbose(&self) -> bool {
        let init = self
            .init_config
            .as_ref()
            .and_then(|i| i.verbose)
            .unwrap_or(false);
        init || self.instances.iter().any(|instance| {
            instance
                .0
                .iter()
                .any(|(k, v)| k.eq_ignore_ascii_case("verbose") && v.as_bool() == Some(true))
        })
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct Init {
    /// Seconds allowed for each fetch, connect included.
    pub timeout: Option<u64>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub verbose: Option<bool>,
    pub transport: Option<TransportKind>,
    pub max_concurrent_instances: Option<usize>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| flag("verbose", &v)))
}

/// A boolean switch. Anything else is logged and reads as unset.
fn flag(key: &str, value: &Value) -> Option<bool> {
    let flag = value.as_bool();
    if flag.is_none() {
        warn!("`{key}` must be true or false, ignoring {value:?}");
    }
    flag
}

/// One raw `instances` entry. Keys are resolved by [`InstanceConfig::resolve`].
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct Instance(pub BTreeMap<String, Value>);

/// A resolved instance, immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceConfig {
    pub endpoint: Endpoint,
    /// Plugin instance reported on every record; `None` when not configured.
    pub name: Option<String>,
    pub filters: FilterTable,
    pub transport: TransportKind,
    pub timeout: Duration,
    pub verbose: bool,
}

impl InstanceConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            endpoint: Endpoint::new(host, port),
            name: None,
            filters: FilterTable::new(),
            transport: TransportKind::default(),
            timeout: defaults::TIMEOUT,
            verbose: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_filter(mut self, suffix: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.filters.insert(suffix.into(), type_name.into());
        self
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn client(&self) -> Client {
        Client::new(self.endpoint.clone(), self.transport, self.timeout)
    }

    /// Resolve a raw instance block against the shared `init_config`.
    ///
    /// Unknown keys are logged and ignored.
    pub fn resolve(init: &Init, instance: &Instance) -> Result<Self, ConfigError> {
        let mut host = None;
        let mut port = None;
        let mut name = None;
        let mut filters = FilterTable::new();
        let mut transport = init.transport;
        let mut timeout = init.timeout;
        let mut verbose = init.verbose.unwrap_or(false);

        debug!("reading instance configuration ({} elements)", instance.0.len());
        for (raw_key, value) in &instance.0 {
            let key = raw_key.to_lowercase();
            match key.as_str() {
                "host" => host = Some(string_value(&key, value)?),
                "port" => port = Some(port_value(value)?),
                "instance" => name = Some(string_value(&key, value)?),
                "transport" => transport = Some(typed_value(&key, value)?),
                "timeout" => timeout = Some(typed_value(&key, value)?),
                "verbose" => verbose |= flag(&key, value).unwrap_or(false),
                _ => match key.strip_prefix(FILTER_PREFIX) {
                    Some(suffix) if !suffix.is_empty() => {
                        let Value::String(type_name) = value else {
                            return Err(ConfigError::InvalidFilter { key });
                        };
                        debug!("filter found: {suffix} -> {type_name}");
                        filters.insert(suffix.to_string(), type_name.clone());
                    }
                    _ => warn!("unknown config key: {raw_key}"),
                },
            }
        }

        Ok(Self {
            endpoint: Endpoint::new(
                host.unwrap_or_else(|| defaults::HOST.to_string()),
                port.unwrap_or(defaults::PORT),
            ),
            name,
            filters,
            transport: transport.unwrap_or_default(),
            timeout: timeout.map_or(defaults::TIMEOUT, Duration::from_secs),
            verbose,
        })
    }
}

fn string_value(key: &str, value: &Value) -> Result<String, ConfigError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}

fn port_value(value: &Value) -> Result<u16, ConfigError> {
    let port = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ConfigError::InvalidValue {
        key: "port".to_string(),
        reason: "expected an integer".to_string(),
    })?;

    u16::try_from(port)
        .ok()
        .filter(|p| *p != 0)
        .ok_or(ConfigError::InvalidPort { port })
}

fn typed_value<T: serde::de::DeserializeOwned>(key: &str, value: &Value) -> Result<T, ConfigError> {
    serde_yaml::from_value(value.clone()).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// The configured instances, shared read-only by every collection cycle.
#[derive(Debug, Clone)]
pub struct Registry {
    instances: Vec<Arc<InstanceConfig>>,
    verbose: bool,
    max_concurrent_instances: usize,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn instances(&self) -> &[Arc<InstanceConfig>] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Whether verbose logging was asked for anywhere in the configuration.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn max_concurrent_instances(&self) -> usize {
        self.max_concurrent_instances
    }
}

/// Collects instances during start-up. Every configuration block appends.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    instances: Vec<InstanceConfig>,
    verbose: bool,
    max_concurrent_instances: Option<usize>,
}

impl RegistryBuilder {
    pub fn add(&mut self, config: InstanceConfig) -> &mut Self {
        self.verbose |= config.verbose;
        debug!(
            "configured instance {} ({})",
            config.name.as_deref().unwrap_or("<unnamed>"),
            config.endpoint
        );
        self.instances.push(config);
        self
    }

    /// Resolve and append one instance block.
    pub fn configure(
        &mut self,
        init: &Init,
        instance: &Instance,
    ) -> Result<&mut Self, ConfigError> {
        let config = InstanceConfig::resolve(init, instance)?;
        Ok(self.add(config))
    }

    /// Append every instance of a configuration file. Invalid instances are
    /// logged and left out. Returns how many were added.
    pub fn configure_global(&mut self, global: &Global) -> usize {
        let init = global.init();
        for key in global.extra.keys().chain(init.extra.keys()) {
            warn!("unknown config key: {key}");
        }
        self.verbose |= init.verbose.unwrap_or(false);
        if let Some(max) = init.max_concurrent_instances {
            self.max_concurrent_instances = Some(max);
        }

        let mut added = 0;
        for (index, instance) in global.instances.iter().enumerate() {
            match self.configure(&init, instance) {
                Ok(_) => added += 1,
                Err(e) => warn!("skipping instance #{index}: {e}"),
            }
        }
        added
    }

    pub fn verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose |= verbose;
        self
    }

    pub fn max_concurrent_instances(&mut self, max: usize) -> &mut Self {
        self.max_concurrent_instances = Some(max);
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            instances: self.instances.into_iter().map(Arc::new).collect(),
            verbose: self.verbose,
            max_concurrent_instances: self
                .max_concurrent_instances
                .unwrap_or(defaults::MAX_CONCURRENT_INSTANCES)
                .max(1),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Global> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: Global =
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

/// Load every `*.yaml` file of a directory, in file name order.
/// Files that fail to parse are logged and skipped.
pub fn load_config_dir(dir: &Path) -> Result<Vec<(String, Global)>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read config directory: {}", dir.display()))?;

    let mut yaml_files: Vec<_> = entries
        .filter_map(|e| match e {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!("skipping unreadable entry in {}: {e}", dir.display());
                None
            }
        })
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .collect();
    yaml_files.sort();

    let mut configs = Vec::new();
    for path in yaml_files {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        match load_config(&path) {
            Ok(config) => configs.push((name, config)),
            Err(e) => warn!("skipping {}: {e:#}", path.display()),
        }
    }
    Ok(configs)
}

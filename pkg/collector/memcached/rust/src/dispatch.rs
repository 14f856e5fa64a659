// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use log::{debug, error};

use crate::PLUGIN_NAME;
use crate::sink::{Sink, metric};
use crate::value::StatValue;

/// Plugin instance used when an instance was configured without a name.
pub const UNKNOWN_INSTANCE: &str = "unknown memcached";

/// Build the record for one filtered stat.
///
/// A missing or empty `plugin_instance` is a configuration mistake; the
/// record is still produced under [`UNKNOWN_INSTANCE`].
pub fn to_metric(
    key: &str,
    type_name: &str,
    value: &StatValue,
    plugin_instance: Option<&str>,
) -> metric::Metric {
    let plugin_instance = match plugin_instance {
        Some(name) if !name.is_empty() => name,
        _ => {
            error!("plugin_instance is not set, stat key: {key}");
            UNKNOWN_INSTANCE
        }
    };

    metric::Metric {
        plugin: PLUGIN_NAME.to_string(),
        plugin_instance: plugin_instance.to_string(),
        type_name: type_name.to_string(),
        type_instance: key.to_string(),
        key: key.to_string(),
        values: vec![metric::Value::from(value)],
    }
}

/// Hand one record to the sink. Sink failures are logged, not returned.
pub fn dispatch_value<S: Sink + ?Sized>(
    sink: &S,
    key: &str,
    type_name: &str,
    value: &StatValue,
    plugin_instance: Option<&str>,
) {
    let metric = to_metric(key, type_name, value, plugin_instance);
    debug!("sending value: {}={}", metric.type_instance, value);
    if let Err(e) = sink.submit_metric(metric) {
        error!("submit metric {key}: {e:#}");
    }
}

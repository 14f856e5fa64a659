// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::io::Write;

use anyhow::Context;

use crate::sink::{Sink, metric};
use crate::Result;

/// Writes one line per record to stdout.
pub struct Console {}

impl Sink for Console {
    fn submit_metric(&self, metric: metric::Metric) -> Result<()> {
        let values: Vec<String> = metric.values.iter().map(ToString::to_string).collect();
        let mut out = std::io::stdout().lock();
        writeln!(
            out,
            "{}/{}/{}-{} {}",
            metric.plugin,
            metric.plugin_instance,
            metric.type_name,
            metric.type_instance,
            values.join(":")
        )
        .context("writing metric to stdout")
    }
}

// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::sink::{Sink, metric};
use crate::Result;

/// Keeps every submitted record in memory.
#[derive(Debug, Default)]
pub struct Memory {
    metrics: Mutex<Vec<metric::Metric>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything submitted so far.
    pub fn take(&self) -> Vec<metric::Metric> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<metric::Metric>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sink for Memory {
    fn submit_metric(&self, metric: metric::Metric) -> Result<()> {
        self.lock().push(metric);
        Ok(())
    }
}

// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Metrics derived from related raw counters.
//!
//! Each rule reads one subcommand's block and appends the entries it can
//! compute. Inputs that are missing or not numeric produce nothing.

use std::collections::BTreeMap;

use log::debug;

use crate::protocol::Subcommand;
use crate::stats::{StatBlock, StatSnapshot};

pub const SYNTHETIC_PREFIX: &str = "synth";

pub trait SyntheticRule: Send + Sync {
    /// The block this rule reads and extends.
    fn subcommand(&self) -> Subcommand;

    /// Derived entries for `block`. Must not fail on malformed input.
    fn derive(&self, block: &StatBlock) -> Vec<(String, String)>;
}

/// `synth:<slab>:slab_size = <slab>:chunk_size * <slab>:total_chunks`
#[derive(Debug, Default, Clone, Copy)]
pub struct SlabSize;

impl SyntheticRule for SlabSize {
    fn subcommand(&self) -> Subcommand {
        Subcommand::Slabs
    }

    fn derive(&self, block: &StatBlock) -> Vec<(String, String)> {
        let mut chunk_sizes = BTreeMap::new();
        let mut total_chunks = BTreeMap::new();

        for (key, value) in block.iter() {
            let Some((slab_id, field)) = key.split_once(':') else {
                continue;
            };
            let target = match field {
                "chunk_size" => &mut chunk_sizes,
                "total_chunks" => &mut total_chunks,
                _ => continue,
            };
            match value.as_integer() {
                Ok(v) => {
                    target.insert(slab_id, v);
                }
                Err(e) => debug!("ignoring slab {slab_id} {field}: {e}"),
            }
        }

        let derived: Vec<(String, String)> = chunk_sizes
            .iter()
            .filter_map(|(slab_id, chunk_size)| {
                let chunks = total_chunks.get(slab_id)?;
                let Some(size) = chunk_size.checked_mul(*chunks) else {
                    debug!("slab {slab_id} size overflows ({chunk_size} * {chunks})");
                    return None;
                };
                Some((
                    format!("{SYNTHETIC_PREFIX}:{slab_id}:slab_size"),
                    size.to_string(),
                ))
            })
            .collect();

        debug!("prepared synthetic slab_size metrics for {} slab(s)", derived.len());
        derived
    }
}

/// The set of rules applied to every snapshot.
pub struct Rules {
    rules: Vec<Box<dyn SyntheticRule>>,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            rules: vec![Box::new(SlabSize)],
        }
    }
}

impl Rules {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with(mut self, rule: impl SyntheticRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Append every rule's derived entries to the block it targets.
    /// Rules whose block is absent from the snapshot are skipped.
    pub fn apply(&self, snapshot: &mut StatSnapshot) {
        for rule in &self.rules {
            if let Some(block) = snapshot.get_mut(rule.subcommand()) {
                let derived = rule.derive(block);
                block.extend(derived);
            }
        }
    }
}

/// Append the default derived metrics to a slabs block.
pub fn augment(mut slabs: StatBlock) -> StatBlock {
    let derived = SlabSize.derive(&slabs);
    slabs.extend(derived);
    slabs
}

// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::collections::BTreeMap;

use crate::protocol::Subcommand;
use crate::value::StatValue;

/// Ordered key/value pairs returned by one `stats` subcommand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatBlock {
    entries: Vec<(String, StatValue)>,
}

impl StatBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<StatValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// First value reported for `key`.
    pub fn get(&self, key: &str) -> Option<&StatValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StatValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<StatValue>> FromIterator<(K, V)> for StatBlock {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<StatValue>> Extend<(K, V)> for StatBlock {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

/// Every block collected from one instance during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatSnapshot {
    blocks: BTreeMap<Subcommand, StatBlock>,
}

impl StatSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subcommand: Subcommand, block: StatBlock) {
        self.blocks.insert(subcommand, block);
    }

    pub fn get(&self, subcommand: Subcommand) -> Option<&StatBlock> {
        self.blocks.get(&subcommand)
    }

    pub fn get_mut(&mut self, subcommand: Subcommand) -> Option<&mut StatBlock> {
        self.blocks.get_mut(&subcommand)
    }

    /// Blocks in subcommand order (general, slabs, items).
    pub fn iter(&self) -> impl Iterator<Item = (Subcommand, &StatBlock)> {
        self.blocks.iter().map(|(s, b)| (*s, b))
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::collections::BTreeMap;

use crate::protocol::Subcommand;
use crate::stats::StatBlock;
use crate::value::StatValue;

/// Stat suffix to monitoring type name, e.g. `cmd_get -> counter`.
pub type FilterTable = BTreeMap<String, String>;

/// A stat that passed the filter, with its qualified key and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredStat {
    pub key: String,
    pub type_name: String,
    pub value: StatValue,
}

/// Trailing component of a possibly colon-qualified key.
pub fn suffix(key: &str) -> &str {
    key.rsplit_once(':').map_or(key, |(_, tail)| tail)
}

/// Prefix `key` with its subcommand unless it already starts with it.
/// General stats are left as they are.
pub fn qualify(subcommand: Subcommand, key: &str) -> String {
    let name = subcommand.as_str();
    if key.starts_with(name) {
        key.to_string()
    } else {
        format!("{name}:{key}")
    }
}

/// Keep the entries whose suffix has a type in `filters`, qualifying their keys.
pub fn filter_and_qualify(
    subcommand: Subcommand,
    block: &StatBlock,
    filters: &FilterTable,
) -> Vec<FilteredStat> {
    block
        .iter()
        .filter_map(|(key, value)| {
            let type_name = filters.get(suffix(key))?;
            Some(FilteredStat {
                key: qualify(subcommand, key),
                type_name: type_name.clone(),
                value: value.clone(),
            })
        })
        .collect()
}

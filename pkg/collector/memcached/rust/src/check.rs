// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! One collection cycle over every configured instance.
//!
//! Instances are fetched concurrently, bounded by the registry's
//! `max_concurrent_instances`. Records are dispatched afterwards, one
//! instance at a time in configuration order.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{InstanceConfig, Registry};
use crate::dispatch::dispatch_value;
use crate::errors::FetchError;
use crate::filter::filter_and_qualify;
use crate::protocol::Subcommand;
use crate::sink::Sink;
use crate::stats::StatSnapshot;
use crate::synthetic::Rules;

/// Counters describing one finished cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub instances_collected: usize,
    pub instances_failed: usize,
    pub records_dispatched: usize,
}

pub struct MemcachedCheck<'a, S: Sink> {
    sink: &'a S,
    registry: Arc<Registry>,
    rules: Arc<Rules>,
}

impl<'a, S: Sink> MemcachedCheck<'a, S> {
    pub fn new(sink: &'a S, registry: Arc<Registry>) -> Self {
        Self::with_rules(sink, registry, Arc::new(Rules::default()))
    }

    pub fn with_rules(sink: &'a S, registry: Arc<Registry>, rules: Arc<Rules>) -> Self {
        Self {
            sink,
            registry,
            rules,
        }
    }

    /// Collect from every instance and dispatch the filtered records.
    ///
    /// An instance that cannot be reached is logged and skipped; the others
    /// are unaffected.
    pub async fn run(&self) -> CycleSummary {
        let instances = self.registry.instances();
        let mut results = collect_all(instances, self.registry.max_concurrent_instances()).await;
        let mut summary = CycleSummary::default();

        for (instance, result) in instances.iter().zip(results.iter_mut()) {
            match result.take() {
                Some(Ok(mut snapshot)) => {
                    self.rules.apply(&mut snapshot);
                    summary.records_dispatched += self.dispatch(instance, &snapshot);
                    summary.instances_collected += 1;
                }
                Some(Err(e)) => {
                    error!("error retrieving stats: {e}");
                    summary.instances_failed += 1;
                }
                None => summary.instances_failed += 1,
            }
        }

        info!(
            "cycle done: {} instance(s) collected, {} failed, {} record(s) dispatched",
            summary.instances_collected, summary.instances_failed, summary.records_dispatched
        );
        summary
    }

    fn dispatch(&self, instance: &InstanceConfig, snapshot: &StatSnapshot) -> usize {
        let mut dispatched = 0;
        for (subcommand, block) in snapshot.iter() {
            for stat in filter_and_qualify(subcommand, block, &instance.filters) {
                dispatch_value(
                    self.sink,
                    &stat.key,
                    &stat.type_name,
                    &stat.value,
                    instance.name.as_deref(),
                );
                dispatched += 1;
            }
        }
        dispatched
    }
}

type Collected = Option<Result<StatSnapshot, FetchError>>;

/// Fetch every instance, returning results indexed like `instances`.
/// A slot stays `None` if its task panicked.
async fn collect_all(instances: &[Arc<InstanceConfig>], max_concurrent: usize) -> Vec<Collected> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let mut tasks = JoinSet::new();

    for (index, instance) in instances.iter().enumerate() {
        let instance = Arc::clone(instance);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            (index, collect(&instance).await)
        });
    }

    let mut results: Vec<Collected> = instances.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => {
                if let Some(slot) = results.get_mut(index) {
                    *slot = Some(result);
                }
            }
            Err(e) => error!("collection task failed: {e}"),
        }
    }
    results
}

/// Fetch the three stats blocks of one instance.
///
/// A connection-level failure on any of them fails the whole instance. A
/// subcommand the server refuses is left out of the snapshot.
pub async fn collect(instance: &InstanceConfig) -> Result<StatSnapshot, FetchError> {
    let client = instance.client();
    debug!("collecting from {} over {}", instance.endpoint, instance.transport);

    let (general, slabs, items) = tokio::join!(
        client.fetch_stats(Subcommand::General),
        client.fetch_stats(Subcommand::Slabs),
        client.fetch_stats(Subcommand::Items),
    );

    let mut snapshot = StatSnapshot::new();
    for (subcommand, result) in [
        (Subcommand::General, general),
        (Subcommand::Slabs, slabs),
        (Subcommand::Items, items),
    ] {
        match result {
            Ok(block) => {
                debug!("stats {subcommand}: {} entries", block.len());
                snapshot.insert(subcommand, block);
            }
            Err(e) if e.is_connection() => return Err(e),
            Err(e) => warn!("{e}"),
        }
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::protocol::TransportKind;
    use crate::sink::Memory;
    use crate::sink::metric::Value;
    use crate::test_utils::{FakeServer, closed_port};

    const GENERAL: &str = "STAT pid 1\r\nSTAT cmd_get 10\r\nSTAT cmd_set 5\r\nEND\r\n";
    const SLABS: &str =
        "STAT 1:chunk_size 96\r\nSTAT 1:total_chunks 100\r\nSTAT active_slabs 1\r\nEND\r\n";
    const ITEMS: &str = "STAT items:1:number 3\r\nSTAT items:1:age 12\r\nEND\r\n";

    fn instance(port: u16, name: &str) -> InstanceConfig {
        InstanceConfig::new("127.0.0.1", port)
            .with_name(name)
            .with_timeout(Duration::from_secs(2))
    }

    fn registry(instances: Vec<InstanceConfig>) -> Arc<Registry> {
        let mut builder = Registry::builder();
        for i in instances {
            builder.add(i);
        }
        Arc::new(builder.build())
    }

    #[tokio::test]
    async fn test_collect_all_subcommands() {
        let server = FakeServer::text(&[("", GENERAL), ("slabs", SLABS), ("items", ITEMS)]).await;
        let snapshot = collect(&instance(server.port(), "a")).await.unwrap();

        assert_eq!(snapshot.iter().count(), 3);
        let slabs = snapshot.get(Subcommand::Slabs).unwrap();
        assert_eq!(slabs.get("1:chunk_size").unwrap().as_str(), "96");
    }

    #[tokio::test]
    async fn test_refused_subcommand_is_dropped() {
        let server = FakeServer::text(&[("", GENERAL), ("slabs", SLABS)]).await;
        let snapshot = collect(&instance(server.port(), "a")).await.unwrap();

        assert!(snapshot.get(Subcommand::General).is_some());
        assert!(snapshot.get(Subcommand::Slabs).is_some());
        assert!(snapshot.get(Subcommand::Items).is_none());
    }

    #[tokio::test]
    async fn test_run_dispatches_filtered_records() {
        let server = FakeServer::text(&[("", GENERAL), ("slabs", SLABS), ("items", ITEMS)]).await;
        let config = instance(server.port(), "cache-a")
            .with_filter("cmd_get", "counter")
            .with_filter("slab_size", "bytes")
            .with_filter("number", "gauge");
        let sink = Memory::new();

        let summary = MemcachedCheck::new(&sink, registry(vec![config])).run().await;

        assert_eq!(
            summary,
            CycleSummary {
                instances_collected: 1,
                instances_failed: 0,
                records_dispatched: 3,
            }
        );
        let records: Vec<(String, String, Vec<Value>)> = sink
            .take()
            .into_iter()
            .map(|m| {
                assert_eq!(m.plugin, "memcached");
                assert_eq!(m.plugin_instance, "cache-a");
                (m.type_instance, m.type_name, m.values)
            })
            .collect();
        assert_eq!(
            records,
            vec![
                ("cmd_get".to_string(), "counter".to_string(), vec![Value::Integer(10)]),
                (
                    "slabs:synth:1:slab_size".to_string(),
                    "bytes".to_string(),
                    vec![Value::Integer(9600)]
                ),
                ("items:1:number".to_string(), "gauge".to_string(), vec![Value::Integer(3)]),
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_instance_does_not_stop_the_others() {
        let server = FakeServer::text(&[("", GENERAL), ("slabs", SLABS), ("items", ITEMS)]).await;
        let down = closed_port().await;
        let sink = Memory::new();

        let summary = MemcachedCheck::new(
            &sink,
            registry(vec![
                instance(down, "down").with_filter("cmd_get", "counter"),
                instance(server.port(), "up").with_filter("cmd_get", "counter"),
            ]),
        )
        .run()
        .await;

        assert_eq!(summary.instances_collected, 1);
        assert_eq!(summary.instances_failed, 1);
        let metrics = sink.take();
        assert_eq!(metrics.len(), 1);
        assert!(metrics.iter().all(|m| m.plugin_instance == "up"));
    }

    #[tokio::test]
    async fn test_undecodable_line_keeps_the_instance() {
        let server = FakeServer::raw(
            b"STAT cmd_get 10\r\nSTAT bad\xff\xfe 1\r\nSTAT threads 4\r\nEND\r\n".to_vec(),
        )
        .await;
        let sink = Memory::new();

        let summary = MemcachedCheck::with_rules(
            &sink,
            registry(vec![instance(server.port(), "a").with_filter("cmd_get", "counter")]),
            Arc::new(Rules::empty()),
        )
        .run()
        .await;

        assert_eq!(summary.instances_collected, 1);
        assert_eq!(summary.instances_failed, 0);
        let metrics = sink.take();
        let general = metrics.first().unwrap();
        assert_eq!(general.type_instance, "cmd_get");
        assert_eq!(general.values, vec![Value::Integer(10)]);
    }

    #[tokio::test]
    async fn test_records_follow_configuration_order() {
        let first = FakeServer::binary(&[
            ("", "cmd_get", "1"),
            ("slabs", "active_slabs", "0"),
            ("items", "items:1:number", "0"),
        ])
        .await;
        let second = FakeServer::text(&[("", GENERAL), ("slabs", SLABS), ("items", ITEMS)]).await;
        let sink = Memory::new();

        let registry = registry(vec![
            instance(first.port(), "first")
                .with_transport(TransportKind::Binary)
                .with_filter("cmd_get", "counter"),
            instance(second.port(), "second").with_filter("cmd_get", "counter"),
            instance(first.port(), "third")
                .with_transport(TransportKind::Binary)
                .with_filter("cmd_get", "counter"),
        ]);
        let check = MemcachedCheck::with_rules(&sink, registry, Arc::new(Rules::empty()));
        check.run().await;

        let names: Vec<String> = sink.take().into_iter().map(|m| m.plugin_instance).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let sink = Memory::new();
        let summary = MemcachedCheck::new(&sink, registry(Vec::new())).run().await;
        assert_eq!(summary, CycleSummary::default());
        assert!(sink.is_empty());
    }
}

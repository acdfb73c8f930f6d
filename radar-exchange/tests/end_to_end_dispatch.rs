/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/


mod support;

use exchange_test_utils::{file_id_of, scan, volume, write_fixture, RecordingStorage};
use radar_exchange::control_plane::config::NodeConfig;
use radar_exchange::ExchangeError;
use support::{apply, QUIET_PERIOD};

const PVOL_SUBSCRIPTION: &str = r#"{subscription: {
    id: "pvol-in",
    storage: "archive",
    filter: {filter_type: "attribute_filter", name: "/what/object",
             operation: "=", value_type: "string", value: "PVOL"},
    statdef: {id: "pvol-received"},
}}"#;

const S1_PUBLICATION: &str = r#"{publication: {
    name: "to-s1",
    active: true,
    connection: {class: "simple", arguments: {sender: {class: "recording", id: "s1"}}},
}}"#;

#[tokio::test]
async fn volume_is_stored_and_published_once() {
    exchange_test_utils::init_logging();

    let test_node = support::make_node(NodeConfig::new("se-node"));
    let node = &test_node.node;
    let archive = RecordingStorage::new("archive");
    node.storages().register(archive.clone());
    apply(node, PVOL_SUBSCRIPTION).await;
    apply(node, S1_PUBLICATION).await;

    let metadata = volume("sehem", "fp-1");
    let file = write_fixture(&metadata);
    let expected = std::fs::read(file.path()).expect("fixture readable");

    let stored = node
        .store_file(file.path(), "peer-a")
        .await
        .expect("first post should be accepted");
    assert_eq!(stored.fingerprint(), "fp-1");
    assert_eq!(archive.stored(), vec![file_id_of(&metadata)]);

    let s1 = test_node.senders.get("s1").expect("sender s1 should be built");
    assert!(support::wait_for_sends(&s1, 1).await);
    assert_eq!(s1.sent_contents(), vec![expected]);
    assert_eq!(test_node.statistics.total("pvol-received"), 1);

    let second = node.store_file(file.path(), "peer-a").await;
    assert!(matches!(second, Err(ExchangeError::Duplicate { .. })));

    tokio::time::sleep(QUIET_PERIOD).await;
    assert_eq!(s1.calls(), 1);
    assert_eq!(archive.count(), 1);

    node.shutdown().await;
}

#[tokio::test]
async fn non_matching_file_reaches_no_one() {
    exchange_test_utils::init_logging();

    let test_node = support::make_node(NodeConfig::new("se-node"));
    let node = &test_node.node;
    let archive = RecordingStorage::new("archive");
    node.storages().register(archive.clone());
    apply(node, PVOL_SUBSCRIPTION).await;
    apply(node, S1_PUBLICATION).await;

    support::post(node, &scan("sehem", "fp-scan", 0.5), "peer-a").await;

    tokio::time::sleep(QUIET_PERIOD).await;
    let s1 = test_node.senders.get("s1").expect("sender s1 should be built");
    assert_eq!(s1.calls(), 0);
    assert_eq!(archive.count(), 0);

    node.shutdown().await;
}

#[tokio::test]
async fn duplicates_reach_only_subscriptions_that_accept_them() {
    exchange_test_utils::init_logging();

    let test_node = support::make_node(NodeConfig::new("se-node"));
    let node = &test_node.node;
    let primary = RecordingStorage::new("primary");
    let mirror = RecordingStorage::new("mirror");
    node.storages().register(primary.clone());
    node.storages().register(mirror.clone());
    apply(node, r#"{subscription: {id: "primary", storage: "primary"}}"#).await;
    apply(
        node,
        r#"{subscription: {id: "mirror", storage: ["mirror"], allow_duplicates: true}}"#,
    )
    .await;

    let file = write_fixture(&volume("sehem", "fp-dup"));
    node.store_file(file.path(), "peer-a")
        .await
        .expect("first post accepted");
    node.store_file(file.path(), "peer-b")
        .await
        .expect("duplicate accepted because one subscription wants it");

    assert_eq!(primary.count(), 1);
    assert_eq!(mirror.count(), 2);
    node.shutdown().await;
}

#[tokio::test]
async fn allowed_ids_restrict_origins() {
    exchange_test_utils::init_logging();

    let test_node = support::make_node(NodeConfig::new("se-node"));
    let node = &test_node.node;
    let archive = RecordingStorage::new("archive");
    node.storages().register(archive.clone());
    apply(
        node,
        r#"{subscription: {id: "trusted", storage: "archive", allowed_ids: ["peer-a"]}}"#,
    )
    .await;

    support::post(node, &volume("sehem", "fp-b"), "peer-b").await;
    support::post(node, &volume("sehem", "fp-a"), "peer-a").await;

    assert_eq!(archive.count(), 1);
    node.shutdown().await;
}

#[tokio::test]
async fn unreadable_file_is_rejected_before_routing() {
    exchange_test_utils::init_logging();

    let test_node = support::make_node(NodeConfig::new("se-node"));
    let node = &test_node.node;
    apply(node, r#"{subscription: {id: "all"}}"#).await;

    let anonymous = write_fixture(&volume("", "fp-anon"));
    let result = node.store_file(anonymous.path(), "peer-a").await;

    assert!(matches!(result, Err(ExchangeError::Lookup { .. })));
    assert!(node.dedup().is_empty().await);
    node.shutdown().await;
}

#[tokio::test]
async fn node_statistics_count_incoming_and_duplicates() {
    exchange_test_utils::init_logging();

    let config: NodeConfig = radar_exchange::control_plane::config::parse_config(
        r#"{node_name: "se-node", statistics: {
            incoming: {id: "incoming"},
            duplicates: {id: "duplicates"},
            file_handling: {id: "handled"},
        }}"#,
    )
    .expect("node configuration should parse");
    let test_node = support::make_node(config);
    let node = &test_node.node;
    apply(node, r#"{subscription: {id: "all"}}"#).await;

    let file = write_fixture(&volume("sehem", "fp-stat"));
    node.store_file(file.path(), "peer-a")
        .await
        .expect("first post accepted");
    let _ = node.store_file(file.path(), "peer-a").await;

    assert_eq!(test_node.statistics.total("incoming"), 2);
    assert_eq!(test_node.statistics.total("duplicates"), 1);
    assert_eq!(test_node.statistics.total("handled"), 1);
    node.shutdown().await;
}

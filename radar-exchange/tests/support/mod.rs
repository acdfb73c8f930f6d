use exchange_test_utils::{
    wait_until, write_fixture, JsonMetadataProvider, RecordingSender, SenderBank, StatisticsBank,
};
use radar_exchange::control_plane::config::{ConfigDocument, NodeConfig};
use radar_exchange::control_plane::plugin_registry::PluginRegistry;
use radar_exchange::{ExchangeNode, Metadata};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

pub(crate) const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);
/// How long to wait before concluding that nothing more will be delivered.
#[allow(dead_code)]
pub(crate) const QUIET_PERIOD: Duration = Duration::from_millis(200);

pub(crate) struct TestNode {
    pub node: ExchangeNode,
    pub senders: SenderBank,
    #[allow(dead_code)]
    pub statistics: StatisticsBank,
}

pub(crate) fn make_node(config: NodeConfig) -> TestNode {
    let senders = SenderBank::new();
    let statistics = StatisticsBank::new();
    let mut plugins = PluginRegistry::with_defaults();
    senders.install(&mut plugins);
    statistics.install(&mut plugins);

    let node = ExchangeNode::new(config, Arc::new(JsonMetadataProvider), plugins)
        .expect("node creation should succeed");

    TestNode {
        node,
        senders,
        statistics,
    }
}

pub(crate) async fn apply(node: &ExchangeNode, document: &str) {
    let document = ConfigDocument::from_json5(document).expect("configuration should parse");
    node.apply_config(&document)
        .await
        .expect("configuration should apply");
}

#[allow(dead_code)]
pub(crate) async fn post(node: &ExchangeNode, metadata: &Metadata, origin: &str) -> NamedTempFile {
    let file = write_fixture(metadata);
    node.store_file(file.path(), origin)
        .await
        .expect("file should be accepted");
    file
}

/// Waits until `sender` has delivered at least `count` files.
#[allow(dead_code)]
pub(crate) async fn wait_for_sends(sender: &RecordingSender, count: usize) -> bool {
    wait_until(DELIVERY_TIMEOUT, || {
        std::future::ready(sender.sent_file_ids().len() >= count)
    })
    .await
}

/// Waits until `sender` has been invoked at least `count` times, failed calls included.
#[allow(dead_code)]
pub(crate) async fn wait_for_calls(sender: &RecordingSender, count: usize) -> bool {
    wait_until(DELIVERY_TIMEOUT, || std::future::ready(sender.calls() >= count)).await
}

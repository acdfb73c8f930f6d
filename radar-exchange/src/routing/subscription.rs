//! Inbound routing rules and the snapshot directory dispatch reads them from.

use crate::matching::{self, Expression, Filter};
use crate::metadata::Metadata;
use crate::observability::events;
use crate::statistics::StatisticsHook;
use arc_swap::ArcSwap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::info;

const COMPONENT: &str = "subscription_directory";

/// One inbound routing rule. Immutable once built.
#[derive(Clone)]
pub struct Subscription {
    id: Option<String>,
    active: bool,
    storages: Vec<String>,
    filter: Filter,
    expression: Expression,
    allow_duplicates: bool,
    allowed_origins: Vec<String>,
    statistics: Vec<Arc<dyn StatisticsHook>>,
}

impl Subscription {
    /// Creates an active subscription matching every file and storing nowhere.
    pub fn new(id: Option<String>) -> Self {
        Self {
            id,
            active: true,
            storages: Vec::new(),
            filter: Filter::Always,
            expression: Filter::Always.compile(),
            allow_duplicates: false,
            allowed_origins: Vec::new(),
            statistics: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.expression = filter.compile();
        self.filter = filter;
        self
    }

    pub fn with_storages<I, S>(mut self, storages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.storages = storages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allow_duplicates(mut self, allow_duplicates: bool) -> Self {
        self.allow_duplicates = allow_duplicates;
        self
    }

    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_statistics(mut self, statistics: Vec<Arc<dyn StatisticsHook>>) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn storages(&self) -> &[String] {
        &self.storages
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn allows_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    pub fn statistics(&self) -> &[Arc<dyn StatisticsHook>] {
        &self.statistics
    }

    /// An empty allow-list admits every origin.
    pub fn permits_origin(&self, origin: &str) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|id| id == origin)
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        matching::matches(metadata, &self.expression)
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .field("storages", &self.storages)
            .field("filter", &self.filter)
            .field("allow_duplicates", &self.allow_duplicates)
            .field("allowed_origins", &self.allowed_origins)
            .field("statistics", &self.statistics.len())
            .finish()
    }
}

/// Ordered subscriptions as seen by one dispatch.
pub struct SubscriptionSnapshot {
    version: u64,
    subscriptions: Vec<Arc<Subscription>>,
}

impl SubscriptionSnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Subscription>> {
        self.subscriptions.iter()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Whether any active subscription lets duplicates through.
    pub fn any_allows_duplicates(&self) -> bool {
        self.subscriptions
            .iter()
            .any(|subscription| subscription.is_active() && subscription.allows_duplicates())
    }
}

/// Registration-ordered subscription list behind an atomically swapped snapshot.
#[derive(Clone)]
pub struct SubscriptionDirectory {
    snapshot: Arc<ArcSwap<SubscriptionSnapshot>>,
}

impl SubscriptionDirectory {
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn new(subscriptions: Vec<Subscription>) -> Self {
        Self {
            snapshot: Arc::new(ArcSwap::from_pointee(SubscriptionSnapshot {
                version: 0,
                subscriptions: subscriptions.into_iter().map(Arc::new).collect(),
            })),
        }
    }

    pub fn snapshot(&self) -> Arc<SubscriptionSnapshot> {
        self.snapshot.load_full()
    }

    pub fn version(&self) -> u64 {
        self.snapshot.load().version
    }

    /// Replaces every subscription at once.
    pub fn replace_all(&self, subscriptions: Vec<Subscription>) {
        let subscriptions: Vec<Arc<Subscription>> =
            subscriptions.into_iter().map(Arc::new).collect();
        self.snapshot.rcu(|current| SubscriptionSnapshot {
            version: current.version + 1,
            subscriptions: subscriptions.clone(),
        });
    }

    /// Appends a subscription, or replaces in place the one with the same id.
    ///
    /// Returns `true` when an existing subscription was replaced.
    pub fn add(&self, subscription: Subscription) -> bool {
        let subscription = Arc::new(subscription);
        let previous = self.snapshot.rcu(|current| {
            let mut subscriptions = current.subscriptions.clone();
            match position(&subscriptions, subscription.id()) {
                Some(index) => subscriptions[index] = subscription.clone(),
                None => subscriptions.push(subscription.clone()),
            }
            SubscriptionSnapshot {
                version: current.version + 1,
                subscriptions,
            }
        });

        let replaced = position(&previous.subscriptions, subscription.id()).is_some();
        info!(
            event = events::SUBSCRIPTION_ADD,
            component = COMPONENT,
            subscription = subscription.id().unwrap_or_default(),
            replaced,
            "subscription registered"
        );
        replaced
    }

    /// Removes the subscription with that id. Returns `true` if one was removed.
    pub fn remove(&self, id: &str) -> bool {
        let previous = self.snapshot.rcu(|current| SubscriptionSnapshot {
            version: current.version + 1,
            subscriptions: current
                .subscriptions
                .iter()
                .filter(|subscription| subscription.id() != Some(id))
                .cloned()
                .collect(),
        });

        let removed = position(&previous.subscriptions, Some(id)).is_some();
        info!(
            event = events::SUBSCRIPTION_REMOVE,
            component = COMPONENT,
            subscription = id,
            removed,
            "subscription removed"
        );
        removed
    }
}

impl Default for SubscriptionDirectory {
    fn default() -> Self {
        Self::empty()
    }
}

/// Subscriptions without an id are never matched by id.
fn position(subscriptions: &[Arc<Subscription>], id: Option<&str>) -> Option<usize> {
    let id = id?;
    subscriptions
        .iter()
        .position(|subscription| subscription.id() == Some(id))
}

#[cfg(test)]
mod tests {
    use super::{Subscription, SubscriptionDirectory};
    use crate::matching::{Filter, Operator, ValueType};
    use crate::metadata::Metadata;
    use serde_json::json;

    fn subscription(id: &str) -> Subscription {
        Subscription::new(Some(id.to_string()))
    }

    #[test]
    fn empty_allow_list_permits_every_origin() {
        let open = subscription("open");
        let scoped = subscription("scoped").with_allowed_origins(["peer-a"]);

        assert!(open.permits_origin("anyone"));
        assert!(scoped.permits_origin("peer-a"));
        assert!(!scoped.permits_origin("peer-b"));
    }

    #[test]
    fn default_filter_matches_everything() {
        assert!(subscription("s").matches(&Metadata::new()));
    }

    #[test]
    fn with_filter_recompiles_expression() {
        let pvol_only = subscription("s").with_filter(Filter::attribute(
            "/what/object",
            Operator::Eq,
            ValueType::String,
            json!("PVOL"),
        ));

        assert!(pvol_only.matches(&Metadata::new().with_attribute("/what/object", "PVOL")));
        assert!(!pvol_only.matches(&Metadata::new().with_attribute("/what/object", "SCAN")));
    }

    #[test]
    fn add_replaces_in_place_and_keeps_order() {
        let directory = SubscriptionDirectory::empty();

        assert!(!directory.add(subscription("a")));
        assert!(!directory.add(subscription("b")));
        assert!(directory.add(subscription("a").with_storages(["s1"])));

        let snapshot = directory.snapshot();
        let ids: Vec<_> = snapshot.iter().map(|s| s.id().unwrap_or_default()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(snapshot.iter().next().map(|s| s.storages().len()), Some(1));
        assert_eq!(directory.version(), 3);
    }

    #[test]
    fn anonymous_subscriptions_are_always_appended() {
        let directory = SubscriptionDirectory::empty();

        directory.add(Subscription::new(None));
        directory.add(Subscription::new(None));

        assert_eq!(directory.snapshot().len(), 2);
    }

    #[test]
    fn held_snapshot_survives_removal() {
        let directory = SubscriptionDirectory::new(vec![subscription("a")]);
        let held = directory.snapshot();

        assert!(directory.remove("a"));
        assert!(!directory.remove("a"));

        assert_eq!(held.len(), 1);
        assert!(directory.snapshot().is_empty());
    }

    #[test]
    fn any_allows_duplicates_ignores_inactive_subscriptions() {
        let directory = SubscriptionDirectory::new(vec![
            subscription("a"),
            subscription("b")
                .with_allow_duplicates(true)
                .with_active(false),
        ]);

        assert!(!directory.snapshot().any_allows_duplicates());

        directory.add(subscription("c").with_allow_duplicates(true));
        assert!(directory.snapshot().any_allows_duplicates());
    }
}

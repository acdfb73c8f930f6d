//! Registration-ordered publication list with stop-on-removal semantics.

use crate::observability::events;
use crate::publication::Publication;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{info, warn};

const COMPONENT: &str = "publication_registry";

/// Publications behind an atomically swapped snapshot.
///
/// In-flight dispatches keep the snapshot they loaded. A removed or replaced publication is
/// handed back to the caller, which must stop it.
#[derive(Clone, Default)]
pub struct PublicationRegistry {
    publications: Arc<ArcSwap<Vec<Arc<Publication>>>>,
}

impl PublicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<Publication>>> {
        self.publications.load_full()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Publication>> {
        self.publications
            .load()
            .iter()
            .find(|publication| publication.name() == name)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.publications
            .load()
            .iter()
            .map(|publication| publication.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.publications.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.publications.load().is_empty()
    }

    /// Appends a publication, or replaces in place the one with the same name.
    ///
    /// Returns the replaced publication, still running.
    pub fn insert(&self, publication: Arc<Publication>) -> Option<Arc<Publication>> {
        let name = publication.name().to_string();
        let previous = self.publications.rcu(|current| {
            let mut next = Vec::clone(current);
            match next.iter().position(|existing| existing.name() == name) {
                Some(index) => next[index] = publication.clone(),
                None => next.push(publication.clone()),
            }
            next
        });

        let replaced = previous
            .iter()
            .find(|existing| existing.name() == name)
            .cloned();
        let event = if replaced.is_some() {
            events::PUBLICATION_REPLACE
        } else {
            events::PUBLICATION_ADD
        };
        info!(
            event,
            component = COMPONENT,
            publication = name.as_str(),
            connection = publication.connection_kind(),
            active = publication.is_active(),
            "publication registered"
        );
        replaced
    }

    /// Removes the publication with that name and returns it, still running.
    pub fn remove(&self, name: &str) -> Option<Arc<Publication>> {
        let previous = self.publications.rcu(|current| {
            current
                .iter()
                .filter(|publication| publication.name() != name)
                .cloned()
                .collect::<Vec<_>>()
        });

        let removed = previous
            .iter()
            .find(|publication| publication.name() == name)
            .cloned();
        info!(
            event = events::PUBLICATION_REMOVE,
            component = COMPONENT,
            publication = name,
            removed = removed.is_some(),
            "publication removed"
        );
        removed
    }

    /// Empties the registry and returns every publication, still running.
    pub fn drain(&self) -> Vec<Arc<Publication>> {
        Vec::clone(&self.publications.swap(Arc::new(Vec::new())))
    }
}

/// Stops a publication off the async executor, since stopping joins worker threads.
pub(crate) async fn stop_publication(publication: Arc<Publication>) {
    let name = publication.name().to_string();
    if let Err(err) = tokio::task::spawn_blocking(move || publication.stop()).await {
        warn!(
            event = events::DELIVERY_WORKER_JOIN_FAILED,
            component = COMPONENT,
            publication = name.as_str(),
            err = %err,
            "stopping publication failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{stop_publication, PublicationRegistry};
    use crate::data_plane::connection::Connection;
    use crate::publication::Publication;
    use std::sync::Arc;

    fn publication(name: &str, queue_size: usize) -> Arc<Publication> {
        Arc::new(
            Publication::builder(name, Connection::Backup(Vec::new()))
                .queue_size(queue_size)
                .start()
                .expect("publication should start"),
        )
    }

    #[tokio::test]
    async fn insert_replaces_in_place_and_returns_previous() {
        let registry = PublicationRegistry::new();
        assert!(registry.insert(publication("a", 1)).is_none());
        assert!(registry.insert(publication("b", 1)).is_none());

        let replaced = registry
            .insert(publication("a", 7))
            .expect("same name should replace");
        stop_publication(replaced.clone()).await;

        assert!(replaced.is_stopped());
        assert_eq!(registry.names(), ["a", "b"]);
        assert_eq!(registry.get("a").map(|p| p.queue_capacity()), Some(7));

        for publication in registry.drain() {
            stop_publication(publication).await;
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn old_snapshot_survives_removal() {
        let registry = PublicationRegistry::new();
        registry.insert(publication("a", 1));
        let before = registry.snapshot();

        let removed = registry.remove("a").expect("publication should be removed");
        stop_publication(removed).await;

        assert_eq!(before.len(), 1);
        assert_eq!(registry.len(), 0);
        assert!(registry.remove("a").is_none());
    }
}

//! Resource mapping store shared by all correlation handlers.
//!
//! Backed by a sharded concurrent map: lookups take a shard read lock and
//! upserts take the shard write lock, so a reader never observes a partially
//! written entry.
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::correlation::infrastructure::mapping::{Resource, ResourceMappings};

#[derive(Debug, Default, Clone)]
pub struct ResourceMappingStore {
    resources: Arc<DashMap<String, Resource>>,
}

impl ResourceMappingStore {
    pub fn new(mappings: ResourceMappings) -> Self {
        Self { resources: Arc::new(mappings.into_iter().collect()) }
    }

    /// Point lookup by exact path.
    pub fn get(&self, path: &str) -> Option<Resource> {
        self.resources.get(path).map(|entry| entry.value().to_owned())
    }

    /// Upserts the mapping for `path`, replacing any previous resource wholesale.
    ///
    /// Returns the replaced resource, if any.
    pub fn insert(&self, path: impl Into<String>, resource: Resource) -> Option<Resource> {
        let path = path.into();
        debug!(path = %path, api_id = %resource.api_id, "inserting resource mapping");
        self.resources.insert(path, resource)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Snapshot of the mapped paths, in no particular order.
    pub fn paths(&self) -> Vec<String> {
        self.resources.iter().map(|entry| entry.key().to_owned()).collect()
    }
}

impl From<ResourceMappings> for ResourceMappingStore {
    fn from(mappings: ResourceMappings) -> Self {
        Self::new(mappings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Resource {
        Resource::new("/v1/orders", "a1", "1.0", "prod", "c1")
    }

    #[test]
    fn unit_store_get() {
        let store =
            ResourceMappingStore::new(ResourceMappings::from([("/v1/orders".to_string(), orders())]));
        assert_eq!(store.get("/v1/orders"), Some(orders()));
        assert_eq!(store.get("/v1/order"), None);
        assert_eq!(store.get(""), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unit_store_insert_idempotent() {
        let once = ResourceMappingStore::default();
        once.insert("/v1/orders", orders());

        let twice = ResourceMappingStore::default();
        twice.insert("/v1/orders", orders());
        assert_eq!(twice.insert("/v1/orders", orders()), Some(orders()));

        assert_eq!(once.get("/v1/orders"), twice.get("/v1/orders"));
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn unit_store_insert_replaces_without_merging() {
        let store = ResourceMappingStore::new(ResourceMappings::from([(
            "/v1/orders".to_string(),
            orders(),
        )]));
        let replacement = Resource { path: "/v1/orders".to_string(), ..Default::default() };
        store.insert("/v1/orders", replacement.clone());

        // Empty fields of the replacement are not filled from the old entry
        assert_eq!(store.get("/v1/orders"), Some(replacement));
    }

    #[test]
    fn unit_store_shared_between_clones() {
        let store = ResourceMappingStore::default();
        let clone = store.clone();
        clone.insert("/v1/orders", orders());
        assert_eq!(store.get("/v1/orders"), Some(orders()));
        assert_eq!(store.paths(), vec!["/v1/orders".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn unit_store_concurrent_readers_and_writer() {
        let store = ResourceMappingStore::default();
        store.insert("/v1/orders", orders());

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..1000 {
                    store.insert(
                        "/v1/orders",
                        Resource::new("/v1/orders", format!("a{i}"), format!("{i}"), "prod", "c1"),
                    );
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    for _ in 0..1000 {
                        let resource = store.get("/v1/orders").unwrap();
                        // api_id and version are always written together
                        if resource.api_id != "a1" || resource.version != "1.0" {
                            assert_eq!(resource.api_id, format!("a{}", resource.version));
                        }
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}

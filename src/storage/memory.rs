//! In-memory resource store

use crate::conversion::media_type::RepresentationPreferences;
use crate::error::{ConversionError, ConversionResult};
use crate::representation::{
    Representation, RepresentationData, RepresentationMetadata, ResourceIdentifier,
};
use crate::storage::ResourceStore;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use oxigraph::model::Quad;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

enum StoredBody {
    Binary(Bytes),
    Quads(Arc<Vec<Quad>>),
}

struct StoredResource {
    metadata: RepresentationMetadata,
    body: StoredBody,
}

/// Keeps fully materialized bodies and serves a fresh stream per read.
///
/// A write drains the incoming stream before touching the map, so a body
/// that fails mid-stream leaves the previous version in place.
#[derive(Default)]
pub struct InMemoryResourceStore {
    resources: RwLock<HashMap<ResourceIdentifier, Arc<StoredResource>>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }

    pub fn contains(&self, identifier: &ResourceIdentifier) -> bool {
        self.resources.read().contains_key(identifier)
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn get_representation(
        &self,
        identifier: &ResourceIdentifier,
        _preferences: &RepresentationPreferences,
    ) -> ConversionResult<Representation> {
        let stored = self
            .resources
            .read()
            .get(identifier)
            .cloned()
            .ok_or_else(|| ConversionError::NotFound {
                path: identifier.path.clone(),
            })?;

        let data = match &stored.body {
            StoredBody::Binary(body) => {
                RepresentationData::Binary(stream::iter([Ok(body.clone())]).boxed())
            }
            StoredBody::Quads(quads) => {
                let quads = Arc::clone(quads);
                let items = (0..quads.len()).map(move |idx| Ok(quads[idx].clone()));
                RepresentationData::Quads(stream::iter(items).boxed())
            }
        };
        Ok(Representation {
            identifier: identifier.clone(),
            metadata: stored.metadata.clone(),
            data,
        })
    }

    async fn set_representation(
        &self,
        identifier: &ResourceIdentifier,
        representation: Representation,
    ) -> ConversionResult<()> {
        let Representation { metadata, data, .. } = representation;
        let body = match data {
            RepresentationData::Binary(chunks) => {
                let body = chunks
                    .try_fold(Vec::new(), |mut body, chunk| async move {
                        body.extend_from_slice(&chunk);
                        Ok(body)
                    })
                    .await?;
                StoredBody::Binary(Bytes::from(body))
            }
            RepresentationData::Quads(quads) => {
                StoredBody::Quads(Arc::new(quads.try_collect().await?))
            }
        };

        tracing::debug!(
            resource = %identifier,
            content_type = %metadata.content_type,
            "storing representation"
        );
        self.resources
            .write()
            .insert(identifier.clone(), Arc::new(StoredResource { metadata, body }));
        Ok(())
    }

    async fn delete_resource(&self, identifier: &ResourceIdentifier) -> ConversionResult<()> {
        match self.resources.write().remove(identifier) {
            Some(_) => Ok(()),
            None => Err(ConversionError::NotFound {
                path: identifier.path.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::media_type::ContentType;
    use assert_matches::assert_matches;

    fn turtle(body: &'static str) -> Representation {
        Representation::from_chunks(
            ResourceIdentifier::new("doc"),
            ContentType::parse("text/turtle").unwrap(),
            [body],
        )
    }

    #[tokio::test]
    async fn test_set_replaces_previous_body() {
        let store = InMemoryResourceStore::new();
        let id = ResourceIdentifier::new("doc");
        store.set_representation(&id, turtle("first")).await.unwrap();
        store.set_representation(&id, turtle("second")).await.unwrap();

        let prefs = RepresentationPreferences::default();
        let body = store.get_representation(&id, &prefs).await.unwrap().read_bytes().await.unwrap();
        assert_eq!(body, b"second");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_each_read_gets_a_fresh_stream() {
        let store = InMemoryResourceStore::new();
        let id = ResourceIdentifier::new("doc");
        store.set_representation(&id, turtle("body")).await.unwrap();

        let prefs = RepresentationPreferences::default();
        for _ in 0..2 {
            let rep = store.get_representation(&id, &prefs).await.unwrap();
            assert!(rep.is_binary());
            assert_eq!(rep.read_bytes().await.unwrap(), b"body");
        }
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_version() {
        let store = InMemoryResourceStore::new();
        let id = ResourceIdentifier::new("doc");
        store.set_representation(&id, turtle("kept")).await.unwrap();

        let failing = Representation::binary(
            id.clone(),
            RepresentationMetadata::new(ContentType::parse("text/turtle").unwrap()),
            stream::iter([Err(ConversionError::internal("disk gone"))]).boxed(),
        );
        assert!(store.set_representation(&id, failing).await.is_err());

        let prefs = RepresentationPreferences::default();
        let body = store.get_representation(&id, &prefs).await.unwrap().read_bytes().await.unwrap();
        assert_eq!(body, b"kept");
    }

    #[tokio::test]
    async fn test_missing_resource() {
        let store = InMemoryResourceStore::new();
        let id = ResourceIdentifier::new("missing");
        assert_matches!(
            store.get_representation(&id, &RepresentationPreferences::default()).await,
            Err(ConversionError::NotFound { .. })
        );
        assert_matches!(
            store.delete_resource(&id).await,
            Err(ConversionError::NotFound { .. })
        );
    }
}

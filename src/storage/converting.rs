//! Negotiating facade over a resource store

use crate::conversion::converter::ConversionRequest;
use crate::conversion::media_type::{ContentType, RepresentationPreferences, compare};
use crate::conversion::registry::ConverterRegistry;
use crate::error::ConversionResult;
use crate::representation::{Representation, ResourceIdentifier};
use crate::storage::ResourceStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Wraps a store and converts representations to what the caller prefers.
///
/// Reads are converted when the stored type is not acceptable. Writes are
/// converted only when inbound preferences are configured, e.g. to store
/// everything as Turtle regardless of what clients submit.
pub struct RepresentationConvertingStore<S> {
    source: S,
    registry: Arc<ConverterRegistry>,
    inbound: Option<RepresentationPreferences>,
}

impl<S: ResourceStore> RepresentationConvertingStore<S> {
    pub fn new(source: S, registry: Arc<ConverterRegistry>) -> Self {
        Self {
            source,
            registry,
            inbound: None,
        }
    }

    /// Convert submitted bodies before they reach the wrapped store
    pub fn with_inbound_preferences(mut self, preferences: RepresentationPreferences) -> Self {
        self.inbound = Some(preferences);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// Convert `representation` unless `preferences` already accept its type
    pub fn negotiate(
        &self,
        representation: Representation,
        preferences: &RepresentationPreferences,
    ) -> ConversionResult<Representation> {
        if accepts_as_is(representation.content_type(), preferences) {
            return Ok(representation);
        }
        let preferences = if preferences.is_empty() {
            // anything goes, but the hub type must still be serialized
            accept_any()
        } else {
            preferences.clone()
        };
        self.registry
            .convert(ConversionRequest::new(representation, preferences))
    }
}

fn accept_any() -> RepresentationPreferences {
    RepresentationPreferences::single(ContentType::any())
}

/// Empty preferences accept anything except the internal hub type, which
/// must be asked for by name.
fn accepts_as_is(content_type: &ContentType, preferences: &RepresentationPreferences) -> bool {
    if preferences.is_empty() {
        return !content_type.is_internal_quads();
    }
    compare(content_type, &preferences.types).is_some()
}

#[async_trait]
impl<S: ResourceStore> ResourceStore for RepresentationConvertingStore<S> {
    async fn get_representation(
        &self,
        identifier: &ResourceIdentifier,
        preferences: &RepresentationPreferences,
    ) -> ConversionResult<Representation> {
        let stored = self.source.get_representation(identifier, preferences).await?;
        self.negotiate(stored, preferences)
    }

    async fn set_representation(
        &self,
        identifier: &ResourceIdentifier,
        representation: Representation,
    ) -> ConversionResult<()> {
        let representation = match self.inbound.as_ref() {
            Some(inbound) => self.negotiate(representation, inbound)?,
            None => representation,
        };
        self.source.set_representation(identifier, representation).await
    }

    async fn delete_resource(&self, identifier: &ResourceIdentifier) -> ConversionResult<()> {
        self.source.delete_resource(identifier).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::media_type::internal_quads;

    fn ct(value: &str) -> ContentType {
        ContentType::parse(value).unwrap()
    }

    #[test]
    fn test_empty_preferences_never_leak_hub_type() {
        let empty = RepresentationPreferences::default();
        assert!(accepts_as_is(&ct("text/turtle"), &empty));
        assert!(!accepts_as_is(&internal_quads(), &empty));
    }

    #[test]
    fn test_wildcard_accepts_stored_syntax() {
        let any = RepresentationPreferences::from_accept_header("*/*").unwrap();
        assert!(accepts_as_is(&ct("text/turtle"), &any));
        assert!(!accepts_as_is(&internal_quads(), &any));
    }
}

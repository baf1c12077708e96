//! Resource store boundary
//!
//! The persistent store is an external collaborator; this module defines the
//! interface the conversion engine needs from it, a reference in-memory
//! implementation, and the negotiating facade that converts on the way in
//! and out.

pub mod converting;
pub mod memory;

pub use converting::RepresentationConvertingStore;
pub use memory::InMemoryResourceStore;

use crate::conversion::media_type::RepresentationPreferences;
use crate::error::ConversionResult;
use crate::representation::{Representation, ResourceIdentifier};
use async_trait::async_trait;

/// Storage of representations keyed by identifier.
///
/// Callers are assumed to be authorized already. Serializing concurrent
/// writes to one resource is the implementation's job.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Representation of `identifier`, ideally in a type `preferences` accepts
    async fn get_representation(
        &self,
        identifier: &ResourceIdentifier,
        preferences: &RepresentationPreferences,
    ) -> ConversionResult<Representation>;

    /// Replace body and metadata of `identifier`
    async fn set_representation(
        &self,
        identifier: &ResourceIdentifier,
        representation: Representation,
    ) -> ConversionResult<()>;

    async fn delete_resource(&self, identifier: &ResourceIdentifier) -> ConversionResult<()>;
}

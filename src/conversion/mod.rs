//! Content negotiation and RDF conversion
//!
//! Converters declare weighted input and output media types. The registry
//! picks the best converter, or a two-hop chain through the internal quad
//! type, for a request's source type and the client's preferences.

pub mod chain;
pub mod converter;
pub mod formats;
pub mod media_type;
pub mod pump;
pub mod quads_to_rdf;
pub mod rdf_to_quads;
pub mod registry;

pub use chain::ChainedConverter;
pub use converter::{ConversionRequest, ConverterDescriptor, RepresentationConverter};
pub use formats::{FormatProvider, OxigraphFormats};
pub use media_type::{
    ContentType, INTERNAL_QUADS, MediaTypeWeights, Preference, RepresentationPreferences,
};
pub use quads_to_rdf::QuadToRdfConverter;
pub use rdf_to_quads::RdfToQuadConverter;
pub use registry::{ConverterRegistry, ConverterRegistryBuilder, Resolution};

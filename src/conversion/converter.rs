//! Converter capability contract

use crate::conversion::media_type::{
    ContentType, MediaTypeWeights, RepresentationPreferences, compare, select_output,
    weights_as_preferences,
};
use crate::error::{ConversionError, ConversionResult};
use crate::representation::{Representation, ResourceIdentifier};

/// Media types a converter consumes and produces, with priority weights
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConverterDescriptor {
    pub input_types: MediaTypeWeights,
    pub output_types: MediaTypeWeights,
}

impl ConverterDescriptor {
    pub fn new(input_types: MediaTypeWeights, output_types: MediaTypeWeights) -> Self {
        Self {
            input_types,
            output_types,
        }
    }

    /// Weight of the best declared input matching `content_type`
    pub fn input_score(&self, content_type: &ContentType) -> Option<f64> {
        compare(content_type, &weights_as_preferences(&self.input_types))
    }

    pub fn accepts(&self, content_type: &ContentType) -> bool {
        self.input_score(content_type).is_some_and(|score| score > 0.0)
    }

    pub fn produces(&self, content_type: &ContentType) -> bool {
        self.output_types
            .get(content_type)
            .is_some_and(|weight| *weight > 0.0)
    }
}

/// A request to convert one representation
#[derive(Debug)]
pub struct ConversionRequest {
    pub identifier: ResourceIdentifier,
    pub representation: Representation,
    pub preferences: RepresentationPreferences,
}

impl ConversionRequest {
    pub fn new(representation: Representation, preferences: RepresentationPreferences) -> Self {
        Self {
            identifier: representation.identifier.clone(),
            representation,
            preferences,
        }
    }

    pub fn source_type(&self) -> &ContentType {
        &self.representation.metadata.content_type
    }
}

/// Something that turns one representation into another.
///
/// Implementations are built once and shared read-only; `handle` must return
/// without consuming the source stream and report parse or serialization
/// faults only through the returned stream.
pub trait RepresentationConverter: Send + Sync {
    /// Stable name for logs, metrics and chain descriptions
    fn name(&self) -> &str;

    fn descriptor(&self) -> &ConverterDescriptor;

    fn input_types(&self) -> &MediaTypeWeights {
        &self.descriptor().input_types
    }

    fn output_types(&self) -> &MediaTypeWeights {
        &self.descriptor().output_types
    }

    /// Chosen output type and combined score for a source type:
    /// `input score × output weight × client score`.
    fn negotiate(
        &self,
        source: &ContentType,
        preferences: &RepresentationPreferences,
    ) -> Option<(ContentType, f64)> {
        let input_score = self.descriptor().input_score(source)?;
        if input_score <= 0.0 {
            return None;
        }
        let (output, output_score) = select_output(self.output_types(), preferences)?;
        Some((output, input_score * output_score))
    }

    fn score(&self, request: &ConversionRequest) -> Option<(ContentType, f64)> {
        self.negotiate(request.source_type(), &request.preferences)
    }

    /// Cheap pre-flight check; never touches the representation's stream.
    fn can_handle(&self, request: &ConversionRequest) -> ConversionResult<()> {
        let source = request.source_type();
        if !self.descriptor().accepts(source) {
            return Err(ConversionError::not_supported(
                source.to_string(),
                format!("{} does not accept this input type", self.name()),
            ));
        }
        if self.negotiate(source, &request.preferences).is_none() {
            return Err(ConversionError::not_supported(
                request.preferences.to_string(),
                format!("{} produces none of the preferred types", self.name()),
            ));
        }
        Ok(())
    }

    /// Start the conversion. The returned stream does the work lazily.
    fn handle(&self, request: ConversionRequest) -> ConversionResult<Representation>;
}

impl std::fmt::Debug for dyn RepresentationConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepresentationConverter")
            .field("name", &self.name())
            .finish()
    }
}

//! Concrete syntax to quad stream conversion

use crate::config::EngineConfig;
use crate::conversion::converter::{ConversionRequest, ConverterDescriptor, RepresentationConverter};
use crate::conversion::formats::FormatProvider;
use crate::conversion::media_type::{MediaTypeWeights, internal_quads};
use crate::conversion::pump::{PumpSink, blocking_stream, emit};
use crate::error::{ConversionError, ConversionResult};
use crate::representation::{Representation, RepresentationData};
use oxigraph::io::{RdfFormat, RdfParseError, RdfParser};
use oxigraph::model::Quad;
use std::sync::Arc;
use tokio_util::io::{StreamReader, SyncIoBridge};

/// Parses any syntax the format provider can read into `internal/quads`.
pub struct RdfToQuadConverter {
    formats: Arc<dyn FormatProvider>,
    descriptor: ConverterDescriptor,
    channel_capacity: usize,
}

impl RdfToQuadConverter {
    pub const NAME: &'static str = "rdf-to-quads";

    pub fn new(formats: Arc<dyn FormatProvider>) -> Self {
        Self::with_config(formats, &EngineConfig::default())
    }

    pub fn with_config(formats: Arc<dyn FormatProvider>, config: &EngineConfig) -> Self {
        let mut output_types = MediaTypeWeights::new();
        output_types.insert(internal_quads(), 1.0);
        let descriptor = ConverterDescriptor::new(formats.parsable_types(), output_types);
        Self {
            formats,
            descriptor,
            channel_capacity: config.channel_capacity,
        }
    }
}

impl RepresentationConverter for RdfToQuadConverter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn descriptor(&self) -> &ConverterDescriptor {
        &self.descriptor
    }

    fn handle(&self, request: ConversionRequest) -> ConversionResult<Representation> {
        self.can_handle(&request)?;
        let source_type = request.source_type().clone();
        let format = self.formats.format_for(&source_type).ok_or_else(|| {
            ConversionError::not_supported(source_type.to_string(), "no grammar for this syntax")
        })?;

        let ConversionRequest {
            identifier,
            representation,
            ..
        } = request;
        let Representation { metadata, data, .. } = representation;
        let RepresentationData::Binary(bytes) = data else {
            return Err(ConversionError::UnexpectedData { expected: "binary" });
        };

        tracing::debug!(
            converter = Self::NAME,
            resource = %identifier,
            from = %source_type,
            "parsing representation into quads"
        );

        let base_iri = identifier.base_iri().map(str::to_string);
        let label = source_type.essence();
        let quads = blocking_stream(self.channel_capacity, move |sink: PumpSink<Quad>| {
            let reader = SyncIoBridge::new(StreamReader::new(bytes));
            let parser = build_parser(format, base_iri.as_deref());
            for result in parser.for_reader(reader) {
                let item = result.map_err(|error| parse_failure(&label, error));
                let failed = item.is_err();
                if !emit(&sink, item) || failed {
                    return;
                }
            }
        });

        Ok(Representation::quads(
            identifier,
            metadata.converted(internal_quads()),
            quads,
        ))
    }
}

fn build_parser(format: RdfFormat, base_iri: Option<&str>) -> RdfParser {
    let Some(base_iri) = base_iri else {
        return RdfParser::from_format(format);
    };
    match RdfParser::from_format(format).with_base_iri(base_iri) {
        Ok(parser) => parser,
        Err(error) => {
            tracing::debug!(base_iri, %error, "ignoring unusable base iri");
            RdfParser::from_format(format)
        }
    }
}

/// Syntax errors become `Parse`; failures of the source stream keep their
/// original kind.
fn parse_failure(content_type: &str, error: RdfParseError) -> ConversionError {
    match error {
        RdfParseError::Io(io_error) => ConversionError::from_io(io_error),
        other => ConversionError::parse(content_type, other.to_string()),
    }
}

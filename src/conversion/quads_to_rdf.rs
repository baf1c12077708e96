//! Quad stream to concrete syntax conversion

use crate::config::EngineConfig;
use crate::conversion::converter::{ConversionRequest, ConverterDescriptor, RepresentationConverter};
use crate::conversion::formats::FormatProvider;
use crate::conversion::media_type::{ContentType, MediaTypeWeights, internal_quads};
use crate::conversion::pump::{PumpSink, blocking_stream, emit};
use crate::error::{ConversionError, ConversionResult};
use crate::representation::{QuadStream, Representation, RepresentationData};
use bytes::Bytes;
use futures::StreamExt;
use oxigraph::io::{RdfFormat, RdfSerializer};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Serializes `internal/quads` into the negotiated syntax.
pub struct QuadToRdfConverter {
    formats: Arc<dyn FormatProvider>,
    descriptor: ConverterDescriptor,
    channel_capacity: usize,
    chunk_size: usize,
}

impl QuadToRdfConverter {
    pub const NAME: &'static str = "quads-to-rdf";

    pub fn new(formats: Arc<dyn FormatProvider>) -> Self {
        Self::with_config(formats, &EngineConfig::default())
    }

    pub fn with_config(formats: Arc<dyn FormatProvider>, config: &EngineConfig) -> Self {
        let mut input_types = MediaTypeWeights::new();
        input_types.insert(internal_quads(), 1.0);
        let descriptor = ConverterDescriptor::new(input_types, formats.serializable_types());
        Self {
            formats,
            descriptor,
            channel_capacity: config.channel_capacity,
            chunk_size: config.chunk_size,
        }
    }
}

impl RepresentationConverter for QuadToRdfConverter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn descriptor(&self) -> &ConverterDescriptor {
        &self.descriptor
    }

    fn handle(&self, request: ConversionRequest) -> ConversionResult<Representation> {
        self.can_handle(&request)?;
        let (target, _) = self.score(&request).ok_or_else(|| {
            ConversionError::not_supported(
                request.preferences.to_string(),
                "no serializable type is preferred",
            )
        })?;
        let format = self.formats.format_for(&target).ok_or_else(|| {
            ConversionError::not_supported(target.to_string(), "no serializer for this syntax")
        })?;

        let ConversionRequest {
            identifier,
            representation,
            ..
        } = request;
        let Representation { metadata, data, .. } = representation;
        let RepresentationData::Quads(quads) = data else {
            return Err(ConversionError::UnexpectedData {
                expected: crate::conversion::media_type::INTERNAL_QUADS,
            });
        };

        tracing::debug!(
            converter = Self::NAME,
            resource = %identifier,
            to = %target,
            "serializing quads"
        );

        let label = target.essence();
        let chunk_size = self.chunk_size;
        let body = blocking_stream(self.channel_capacity, move |sink: PumpSink<Bytes>| {
            serialize_all(quads, format, &label, ChunkWriter::new(sink, chunk_size));
        });

        Ok(Representation::binary(
            identifier,
            metadata.converted(content_type_for(target, format)),
            body,
        ))
    }
}

/// JSON-LD carries its profile in the content type; everything else is
/// announced by essence.
fn content_type_for(target: ContentType, format: RdfFormat) -> ContentType {
    if matches!(format, RdfFormat::JsonLd { .. }) {
        target
    } else {
        target.without_params()
    }
}

fn serialize_all(mut quads: QuadStream, format: RdfFormat, label: &str, writer: ChunkWriter) {
    let handle = Handle::current();
    let sink = writer.sink.clone();
    let mut serializer = RdfSerializer::from_format(format).for_writer(writer);

    loop {
        match handle.block_on(quads.next()) {
            Some(Ok(quad)) => {
                if let Err(error) = serializer.serialize_quad(&quad) {
                    report_write_failure(&sink, label, error);
                    return;
                }
            }
            Some(Err(upstream)) => {
                // forwarded unmodified; chunks still buffered in the writer are discarded
                emit(&sink, Err(upstream));
                return;
            }
            None => break,
        }
    }

    match serializer.finish() {
        Ok(mut writer) => {
            if let Err(error) = writer.flush() {
                report_write_failure(&sink, label, error);
            }
        }
        Err(error) => report_write_failure(&sink, label, error),
    }
}

fn report_write_failure(sink: &PumpSink<Bytes>, label: &str, error: io::Error) {
    if sink.is_closed() {
        // consumer went away; nobody is left to tell
        return;
    }
    let error = match error.get_ref() {
        Some(inner) if inner.is::<ConversionError>() => ConversionError::from_io(error),
        _ => ConversionError::serialization(label, error.to_string()),
    };
    emit(sink, Err(error));
}

/// `io::Write` adapter that forwards fixed-size chunks into a pump sink
struct ChunkWriter {
    sink: PumpSink<Bytes>,
    buffer: Vec<u8>,
    chunk_size: usize,
}

impl ChunkWriter {
    fn new(sink: PumpSink<Bytes>, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            sink,
            buffer: Vec::with_capacity(chunk_size),
            chunk_size,
        }
    }

    fn send_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(
            &mut self.buffer,
            Vec::with_capacity(self.chunk_size),
        ));
        if emit(&self.sink, Ok(chunk)) {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "representation consumer dropped",
            ))
        }
    }
}

impl Write for ChunkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() >= self.chunk_size {
            self.send_buffer()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffer()
    }
}

//! Representations flowing through the conversion pipeline
//!
//! A [`Representation`] owns a lazy, single-consumption stream. It does not
//! implement `Clone`: handing one to a converter or store moves the stream.

use crate::conversion::media_type::{ContentType, INTERNAL_QUADS};
use crate::error::{ConversionError, ConversionResult};
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use oxigraph::model::Quad;
use std::collections::BTreeSet;
use std::fmt;

/// Opaque byte chunks; an `Err` item is terminal
pub type ByteStream = BoxStream<'static, ConversionResult<Bytes>>;

/// Parsed quads; an `Err` item is terminal
pub type QuadStream = BoxStream<'static, ConversionResult<Quad>>;

/// Path or IRI naming a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentifier {
    pub path: String,
}

impl ResourceIdentifier {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The path when it is an absolute IRI usable as a parser base
    pub fn base_iri(&self) -> Option<&str> {
        let (scheme, rest) = self.path.split_once(':')?;
        let valid_scheme = scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        (valid_scheme && !rest.is_empty()).then_some(self.path.as_str())
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&str> for ResourceIdentifier {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Descriptive metadata travelling with a body
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentationMetadata {
    pub content_type: ContentType,
    /// Metadata quads describing the resource, not part of the body
    pub raw: Vec<Quad>,
    pub profiles: BTreeSet<String>,
}

impl RepresentationMetadata {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            raw: Vec::new(),
            profiles: BTreeSet::new(),
        }
    }

    /// Metadata for a converted body: new content type, resource quads kept,
    /// profiles dropped because they describe the previous serialization.
    pub fn converted(&self, content_type: ContentType) -> Self {
        Self {
            content_type,
            raw: self.raw.clone(),
            profiles: BTreeSet::new(),
        }
    }
}

/// The body of a representation. Exactly one interpretation is active.
pub enum RepresentationData {
    Binary(ByteStream),
    Quads(QuadStream),
}

impl fmt::Debug for RepresentationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepresentationData::Binary(_) => f.write_str("Binary(..)"),
            RepresentationData::Quads(_) => f.write_str("Quads(..)"),
        }
    }
}

#[derive(Debug)]
pub struct Representation {
    pub identifier: ResourceIdentifier,
    pub metadata: RepresentationMetadata,
    pub data: RepresentationData,
}

impl Representation {
    pub fn binary(
        identifier: ResourceIdentifier,
        metadata: RepresentationMetadata,
        data: ByteStream,
    ) -> Self {
        Self {
            identifier,
            metadata,
            data: RepresentationData::Binary(data),
        }
    }

    /// Quad representation; the content type is forced to the hub type.
    pub fn quads(
        identifier: ResourceIdentifier,
        metadata: RepresentationMetadata,
        data: QuadStream,
    ) -> Self {
        let metadata = RepresentationMetadata {
            content_type: crate::conversion::media_type::internal_quads(),
            ..metadata
        };
        Self {
            identifier,
            metadata,
            data: RepresentationData::Quads(data),
        }
    }

    /// Binary representation over an in-memory body, split into the given chunks
    pub fn from_chunks<I, C>(identifier: ResourceIdentifier, content_type: ContentType, chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        let chunks: Vec<ConversionResult<Bytes>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::binary(
            identifier,
            RepresentationMetadata::new(content_type),
            stream::iter(chunks).boxed(),
        )
    }

    pub fn from_quads(identifier: ResourceIdentifier, quads: Vec<Quad>) -> Self {
        let items: Vec<ConversionResult<Quad>> = quads.into_iter().map(Ok).collect();
        Self::quads(
            identifier,
            RepresentationMetadata::new(crate::conversion::media_type::internal_quads()),
            stream::iter(items).boxed(),
        )
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.data, RepresentationData::Binary(_))
    }

    pub fn content_type(&self) -> &ContentType {
        &self.metadata.content_type
    }

    pub fn into_byte_stream(self) -> ConversionResult<ByteStream> {
        match self.data {
            RepresentationData::Binary(stream) => Ok(stream),
            RepresentationData::Quads(_) => Err(ConversionError::UnexpectedData { expected: "binary" }),
        }
    }

    pub fn into_quad_stream(self) -> ConversionResult<QuadStream> {
        match self.data {
            RepresentationData::Quads(stream) => Ok(stream),
            RepresentationData::Binary(_) => Err(ConversionError::UnexpectedData {
                expected: INTERNAL_QUADS,
            }),
        }
    }

    /// Drain a binary body. Surfaces the stream's terminal error, if any.
    pub async fn read_bytes(self) -> ConversionResult<Vec<u8>> {
        let stream = self.into_byte_stream()?;
        stream
            .try_fold(Vec::new(), |mut body, chunk| async move {
                body.extend_from_slice(&chunk);
                Ok(body)
            })
            .await
    }

    /// Drain a quad body. Surfaces the stream's terminal error, if any.
    pub async fn read_quads(self) -> ConversionResult<Vec<Quad>> {
        self.into_quad_stream()?.try_collect().await
    }
}

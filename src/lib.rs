pub mod config;
pub mod conversion;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod representation;
pub mod storage;

pub use config::{CliArgs, ConvertConfig, EngineConfig};
pub use conversion::{
    ContentType, ConversionRequest, ConverterRegistry, OxigraphFormats,
    RepresentationConverter, RepresentationPreferences,
};
pub use error::{ConversionError, ConversionResult};
pub use logging::{LoggingConfig, conversion_span, init_logging};
pub use metrics::{METRICS, MetricsCollector};
pub use representation::{Representation, RepresentationMetadata, ResourceIdentifier};
pub use storage::{InMemoryResourceStore, RepresentationConvertingStore, ResourceStore};

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::Instrument;

/// Convert one file as described by `config`, writing the body to `sink`.
///
/// The input is stored in an in-memory store behind a negotiating facade and
/// read back with the configured accept header. Returns the content type of
/// the body that was written.
pub async fn run_conversion<W>(config: &ConvertConfig, sink: &mut W) -> Result<ContentType>
where
    W: AsyncWrite + Unpin,
{
    let content_type = config.resolve_content_type()?;
    let content_type = ContentType::parse(&content_type)?;
    let preferences = RepresentationPreferences::from_accept_header(&config.accept)?;
    let identifier = ResourceIdentifier::new(config.resource_identifier());

    let span = conversion_span(&identifier.path, &content_type.to_string(), &config.accept);
    async move {
        let formats = Arc::new(OxigraphFormats::new());
        let registry = Arc::new(ConverterRegistry::with_rdf_converters(formats, &config.engine));
        let store = RepresentationConvertingStore::new(InMemoryResourceStore::new(), registry);

        let file = tokio::fs::File::open(&config.input)
            .await
            .with_context(|| format!("failed to open {:?}", config.input))?;
        let chunks = ReaderStream::with_capacity(file, config.engine.chunk_size)
            .map_err(ConversionError::from_io)
            .boxed();
        let input = Representation::binary(
            identifier.clone(),
            RepresentationMetadata::new(content_type),
            chunks,
        );
        store.set_representation(&identifier, input).await?;

        let output = store.get_representation(&identifier, &preferences).await?;
        let output_type = output.content_type().clone();
        tracing::info!(content_type = %output_type, "writing converted representation");

        let mut body = output.into_byte_stream()?;
        let mut written = 0usize;
        while let Some(chunk) = body.next().await {
            let chunk: Bytes = chunk?;
            written += chunk.len();
            sink.write_all(&chunk).await.context("failed to write output")?;
        }
        sink.flush().await.context("failed to flush output")?;

        tracing::debug!(bytes = written, "conversion finished");
        Ok::<_, anyhow::Error>(output_type)
    }
    .instrument(span)
    .await
}

//! Converter registry and chain resolution
//!
//! Resolution considers every registered converter as a direct bridge and
//! every `source → internal/quads → target` pair as a two-hop chain. The hub is
//! a star, so the search is linear in the number of converters per hop and
//! never looks at longer paths.
//!
//! The winner has the highest combined score. An exact tie goes to a direct
//! converter over a chain, then to registration order.

use crate::config::EngineConfig;
use crate::conversion::chain::ChainedConverter;
use crate::conversion::converter::{ConversionRequest, RepresentationConverter};
use crate::conversion::formats::FormatProvider;
use crate::conversion::media_type::{ContentType, RepresentationPreferences, internal_quads};
use crate::conversion::quads_to_rdf::QuadToRdfConverter;
use crate::conversion::rdf_to_quads::RdfToQuadConverter;
use crate::error::{ConversionError, ConversionResult};
use crate::metrics::{METRICS, MetricsCollector};
use crate::representation::{Representation, RepresentationData};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of [`ConverterRegistry::resolve`]
pub enum Resolution {
    Single(Arc<dyn RepresentationConverter>),
    Chain(Arc<ChainedConverter>),
}

impl Resolution {
    /// Converters in execution order
    pub fn converters(&self) -> Vec<Arc<dyn RepresentationConverter>> {
        match self {
            Resolution::Single(converter) => vec![Arc::clone(converter)],
            Resolution::Chain(chain) => chain.hops().to_vec(),
        }
    }

    pub fn is_chain(&self) -> bool {
        matches!(self, Resolution::Chain(_))
    }

    pub fn path_kind(&self) -> &'static str {
        match self {
            Resolution::Single(_) => "direct",
            Resolution::Chain(_) => "chain",
        }
    }

    pub fn into_converter(self) -> Arc<dyn RepresentationConverter> {
        match self {
            Resolution::Single(converter) => converter,
            Resolution::Chain(chain) => chain as Arc<dyn RepresentationConverter>,
        }
    }

    fn converter(&self) -> &dyn RepresentationConverter {
        match self {
            Resolution::Single(converter) => converter.as_ref(),
            Resolution::Chain(chain) => chain.as_ref() as &dyn RepresentationConverter,
        }
    }
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .converters()
            .iter()
            .map(|converter| converter.name().to_string())
            .collect();
        f.debug_struct("Resolution")
            .field("path", &self.path_kind())
            .field("converters", &names)
            .finish()
    }
}

/// Builder collecting converters before the registry is frozen
pub struct ConverterRegistryBuilder {
    converters: Vec<Arc<dyn RepresentationConverter>>,
    enable_chains: bool,
    metrics: Arc<MetricsCollector>,
}

impl ConverterRegistryBuilder {
    pub fn register(mut self, converter: Arc<dyn RepresentationConverter>) -> Self {
        self.converters.push(converter);
        self
    }

    pub fn enable_chains(mut self, enabled: bool) -> Self {
        self.enable_chains = enabled;
        self
    }

    pub fn metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn build(self) -> ConverterRegistry {
        for converter in &self.converters {
            if converter.output_types().is_empty() {
                tracing::warn!(converter = converter.name(), "converter declares no output types");
            }
        }
        ConverterRegistry {
            converters: self.converters,
            enable_chains: self.enable_chains,
            metrics: self.metrics,
        }
    }
}

/// Immutable set of converters shared by all requests
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn RepresentationConverter>>,
    enable_chains: bool,
    metrics: Arc<MetricsCollector>,
}

/// Scored candidate during resolution
struct Candidate {
    score: f64,
    resolution: Resolution,
}

impl ConverterRegistry {
    pub fn builder() -> ConverterRegistryBuilder {
        ConverterRegistryBuilder {
            converters: Vec::new(),
            enable_chains: true,
            metrics: Arc::clone(&METRICS),
        }
    }

    /// Registry with the syntax→quads and quads→syntax converters for `formats`
    pub fn with_rdf_converters(formats: Arc<dyn FormatProvider>, config: &EngineConfig) -> Self {
        Self::builder()
            .register(Arc::new(RdfToQuadConverter::with_config(
                Arc::clone(&formats),
                config,
            )))
            .register(Arc::new(QuadToRdfConverter::with_config(formats, config)))
            .enable_chains(config.enable_chains)
            .build()
    }

    pub fn converters(&self) -> &[Arc<dyn RepresentationConverter>] {
        &self.converters
    }

    /// Find the best converter or two-hop chain for `request`.
    ///
    /// Never touches the representation's stream.
    pub fn resolve(&self, request: &ConversionRequest) -> ConversionResult<Resolution> {
        let started = Instant::now();
        let result = self.resolve_types(request.source_type(), &request.preferences);
        self.metrics.record_resolution(started.elapsed());
        result
    }

    /// Resolution on types alone
    pub fn resolve_types(
        &self,
        source: &ContentType,
        preferences: &RepresentationPreferences,
    ) -> ConversionResult<Resolution> {
        let mut best = self.best_direct(source, preferences);

        if self.enable_chains {
            if let Some(chain) = self.best_chain(source, preferences) {
                // strictly better only: direct converters win exact ties
                if best.as_ref().is_none_or(|direct| chain.score > direct.score) {
                    best = Some(chain);
                }
            }
        }

        match best {
            Some(candidate) => {
                tracing::debug!(
                    from = %source,
                    preferences = %preferences,
                    path = candidate.resolution.path_kind(),
                    converter = candidate.resolution.converter().name(),
                    score = candidate.score,
                    "resolved conversion"
                );
                Ok(candidate.resolution)
            }
            None => {
                tracing::debug!(from = %source, preferences = %preferences, "no conversion path");
                Err(ConversionError::NoConversionPath {
                    from: source.to_string(),
                    preferences: preferences.to_string(),
                })
            }
        }
    }

    fn best_direct(
        &self,
        source: &ContentType,
        preferences: &RepresentationPreferences,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for converter in &self.converters {
            let Some((_, score)) = converter.negotiate(source, preferences) else {
                continue;
            };
            if best.as_ref().is_none_or(|current| score > current.score) {
                best = Some(Candidate {
                    score,
                    resolution: Resolution::Single(Arc::clone(converter)),
                });
            }
        }
        best
    }

    fn best_chain(
        &self,
        source: &ContentType,
        preferences: &RepresentationPreferences,
    ) -> Option<Candidate> {
        let hub = internal_quads();
        if source.is_internal_quads() {
            return None;
        }
        let hub_preferences = RepresentationPreferences::single(hub.clone());

        let mut best: Option<(f64, usize, usize)> = None;
        for (first_idx, first) in self.converters.iter().enumerate() {
            let Some((output, first_score)) = first.negotiate(source, &hub_preferences) else {
                continue;
            };
            if output != hub {
                continue;
            }
            for (second_idx, second) in self.converters.iter().enumerate() {
                if second_idx == first_idx {
                    continue;
                }
                let Some((_, second_score)) = second.negotiate(&hub, preferences) else {
                    continue;
                };
                let score = first_score * second_score;
                if best.is_none_or(|(current, _, _)| score > current) {
                    best = Some((score, first_idx, second_idx));
                }
            }
        }

        let (score, first_idx, second_idx) = best?;
        let hops = vec![
            Arc::clone(&self.converters[first_idx]),
            Arc::clone(&self.converters[second_idx]),
        ];
        match ChainedConverter::new(hops) {
            Ok(chain) => Some(Candidate {
                score,
                resolution: Resolution::Chain(Arc::new(chain)),
            }),
            Err(error) => {
                tracing::error!(%error, "failed to assemble converter chain");
                None
            }
        }
    }

    /// Resolve and start a conversion.
    ///
    /// Pre-flight failures return here; parse and serialization failures show
    /// up on the returned representation's stream.
    pub fn convert(&self, request: ConversionRequest) -> ConversionResult<Representation> {
        let resolution = match self.resolve(&request) {
            Ok(resolution) => resolution,
            Err(error) => {
                self.metrics.record_conversion_rejected("none", &error);
                return Err(error);
            }
        };
        let path = resolution.path_kind();
        let span = tracing::debug_span!(
            "conversion",
            resource = %request.identifier,
            from = %request.source_type(),
            path,
        );
        let _entered = span.enter();

        let converter = resolution.into_converter();
        match converter.handle(request) {
            Ok(representation) => {
                self.metrics.record_conversion_started(path);
                tracing::debug!(
                    converter = converter.name(),
                    to = %representation.metadata.content_type,
                    "conversion started"
                );
                Ok(self.observe(representation))
            }
            Err(error) => {
                self.metrics.record_conversion_rejected(path, &error);
                Err(error)
            }
        }
    }

    fn observe(&self, representation: Representation) -> Representation {
        let Representation {
            identifier,
            metadata,
            data,
        } = representation;
        let data = match data {
            RepresentationData::Binary(stream) => {
                RepresentationData::Binary(self.metrics.observe_stream(stream))
            }
            RepresentationData::Quads(stream) => {
                RepresentationData::Quads(self.metrics.observe_stream(stream))
            }
        };
        Representation {
            identifier,
            metadata,
            data,
        }
    }
}

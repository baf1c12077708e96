//! Converters composed through intermediate types

use crate::conversion::converter::{ConversionRequest, ConverterDescriptor, RepresentationConverter};
use crate::conversion::media_type::{ContentType, RepresentationPreferences};
use crate::error::{ConversionError, ConversionResult};
use crate::representation::Representation;
use std::sync::Arc;

/// Runs converters back to back through the quad hub. Only the last hop sees
/// the client's preferences.
pub struct ChainedConverter {
    name: String,
    hops: Vec<Arc<dyn RepresentationConverter>>,
    descriptor: ConverterDescriptor,
}

impl ChainedConverter {
    pub fn new(hops: Vec<Arc<dyn RepresentationConverter>>) -> ConversionResult<Self> {
        let (Some(first), Some(last)) = (hops.first(), hops.last()) else {
            return Err(ConversionError::internal("a converter chain needs at least one hop"));
        };
        let descriptor =
            ConverterDescriptor::new(first.input_types().clone(), last.output_types().clone());
        let name = hops
            .iter()
            .map(|hop| hop.name())
            .collect::<Vec<_>>()
            .join(" -> ");
        Ok(Self {
            name,
            hops,
            descriptor,
        })
    }

    pub fn hops(&self) -> &[Arc<dyn RepresentationConverter>] {
        &self.hops
    }

    /// Preferences for the hop at `index`: intermediate hops are asked for the
    /// quad hub, the last hop for what the client wants.
    fn hop_preferences(
        &self,
        index: usize,
        client: &RepresentationPreferences,
    ) -> RepresentationPreferences {
        if index + 1 < self.hops.len() {
            RepresentationPreferences::internal_quads()
        } else {
            client.clone()
        }
    }
}

impl RepresentationConverter for ChainedConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &ConverterDescriptor {
        &self.descriptor
    }

    /// Product of the per-hop scores, threading each hop's chosen output into
    /// the next hop as its source type.
    fn negotiate(
        &self,
        source: &ContentType,
        preferences: &RepresentationPreferences,
    ) -> Option<(ContentType, f64)> {
        let mut current = source.clone();
        let mut score = 1.0;
        for (index, hop) in self.hops.iter().enumerate() {
            let hop_preferences = self.hop_preferences(index, preferences);
            let (output, hop_score) = hop.negotiate(&current, &hop_preferences)?;
            score *= hop_score;
            current = output;
        }
        Some((current, score))
    }

    fn handle(&self, request: ConversionRequest) -> ConversionResult<Representation> {
        self.can_handle(&request)?;
        let ConversionRequest {
            identifier,
            mut representation,
            preferences,
        } = request;

        for (index, hop) in self.hops.iter().enumerate() {
            let hop_request = ConversionRequest {
                identifier: identifier.clone(),
                representation,
                preferences: self.hop_preferences(index, &preferences),
            };
            tracing::trace!(
                chain = %self.name,
                hop = hop.name(),
                from = %hop_request.source_type(),
                "starting chain hop"
            );
            representation = hop.handle(hop_request)?;
        }
        Ok(representation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::media_type::{INTERNAL_QUADS, weights};

    struct Fixed {
        name: &'static str,
        descriptor: ConverterDescriptor,
    }

    impl Fixed {
        fn new(name: &'static str, inputs: &[(&str, f64)], outputs: &[(&str, f64)]) -> Arc<Self> {
            Arc::new(Self {
                name,
                descriptor: ConverterDescriptor::new(
                    weights(inputs.iter().copied()).unwrap(),
                    weights(outputs.iter().copied()).unwrap(),
                ),
            })
        }
    }

    impl RepresentationConverter for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn descriptor(&self) -> &ConverterDescriptor {
            &self.descriptor
        }

        fn handle(&self, request: ConversionRequest) -> ConversionResult<Representation> {
            Ok(request.representation)
        }
    }

    #[test]
    fn test_intermediate_hop_targets_hub() {
        let parse = Fixed::new(
            "parse",
            &[("text/turtle", 1.0)],
            &[("text/plain", 1.0), (INTERNAL_QUADS, 0.8)],
        );
        let write = Fixed::new(
            "write",
            &[(INTERNAL_QUADS, 0.5), ("text/plain", 1.0)],
            &[("application/n-triples", 1.0)],
        );
        let chain = ChainedConverter::new(vec![parse, write]).unwrap();
        assert_eq!(chain.name(), "parse -> write");

        let client =
            RepresentationPreferences::single(ContentType::parse("application/n-triples").unwrap());
        let (output, score) = chain
            .negotiate(&ContentType::parse("text/turtle").unwrap(), &client)
            .unwrap();
        assert_eq!(output.essence(), "application/n-triples");
        // 0.8 for reaching the hub, 0.5 × 1.0 for leaving it; the hub weight counts once
        assert!((score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        assert!(ChainedConverter::new(Vec::new()).is_err());
    }
}

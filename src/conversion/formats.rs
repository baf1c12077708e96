//! RDF format capability discovery
//!
//! Converters ask a [`FormatProvider`] which syntaxes it can read and write
//! when they are built, so their declared types always match what the
//! underlying library supports.

use crate::conversion::media_type::{ContentType, MediaTypeWeights};
use oxigraph::io::RdfFormat;

/// External parse/serialize capability
pub trait FormatProvider: Send + Sync {
    /// Syntaxes that can be parsed, with priority weights
    fn parsable_types(&self) -> MediaTypeWeights;

    /// Syntaxes that can be written, with priority weights
    fn serializable_types(&self) -> MediaTypeWeights;

    /// Library format handling `content_type`, if any
    fn format_for(&self, content_type: &ContentType) -> Option<RdfFormat>;
}

/// Candidate media types with `(parse weight, serialize weight)`.
///
/// A zero serialize weight marks an input-only syntax. Candidates the library
/// does not recognize are dropped when probing.
const CANDIDATES: &[(&str, f64, f64)] = &[
    ("application/n-quads", 1.0, 0.9),
    ("application/trig", 0.95, 0.9),
    ("application/ld+json", 0.9, 0.8),
    ("application/n-triples", 0.8, 0.9),
    ("text/turtle", 0.6, 1.0),
    ("application/rdf+xml", 0.5, 0.5),
    ("text/n3", 0.35, 0.0),
    ("application/json", 0.45, 0.0),
];

/// [`FormatProvider`] backed by `oxigraph::io`
#[derive(Debug, Clone)]
pub struct OxigraphFormats {
    parsable: MediaTypeWeights,
    serializable: MediaTypeWeights,
}

impl OxigraphFormats {
    pub fn new() -> Self {
        let mut parsable = MediaTypeWeights::new();
        let mut serializable = MediaTypeWeights::new();

        for (media_type, parse_weight, serialize_weight) in CANDIDATES {
            if RdfFormat::from_media_type(media_type).is_none() {
                tracing::debug!(media_type = *media_type, "rdf library does not recognize media type");
                continue;
            }
            let Ok(content_type) = ContentType::parse(media_type) else {
                continue;
            };
            if *parse_weight > 0.0 {
                parsable.insert(content_type.clone(), *parse_weight);
            }
            if *serialize_weight > 0.0 {
                serializable.insert(content_type, *serialize_weight);
            }
        }

        tracing::debug!(
            parsable = parsable.len(),
            serializable = serializable.len(),
            "discovered rdf formats"
        );
        Self {
            parsable,
            serializable,
        }
    }
}

impl Default for OxigraphFormats {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatProvider for OxigraphFormats {
    fn parsable_types(&self) -> MediaTypeWeights {
        self.parsable.clone()
    }

    fn serializable_types(&self) -> MediaTypeWeights {
        self.serializable.clone()
    }

    fn format_for(&self, content_type: &ContentType) -> Option<RdfFormat> {
        RdfFormat::from_media_type(&content_type.to_string())
            .or_else(|| RdfFormat::from_media_type(&content_type.essence()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovers_core_syntaxes() {
        let formats = OxigraphFormats::new();
        let parsable = formats.parsable_types();
        let serializable = formats.serializable_types();

        for media_type in ["text/turtle", "application/n-triples", "application/ld+json"] {
            let content_type = ContentType::parse(media_type).unwrap();
            assert!(parsable.contains_key(&content_type), "{media_type} not parsable");
            assert!(serializable.contains_key(&content_type), "{media_type} not serializable");
        }
        assert!(parsable.values().chain(serializable.values()).all(|w| *w > 0.0 && *w <= 1.0));
    }

    #[test]
    fn test_format_lookup_ignores_charset() {
        let formats = OxigraphFormats::new();
        let turtle = ContentType::parse("text/turtle; charset=utf-8").unwrap();
        assert_eq!(formats.format_for(&turtle), Some(RdfFormat::Turtle));
    }
}

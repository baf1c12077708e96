//! Media type parsing and weighted preference matching
//!
//! Scores a concrete content type against a client preference list:
//! - `*/*` matches everything, `type/*` matches within a top-level type
//! - each matching entry contributes `weight × specificity`
//!   (exact 1.0, `type/*` 0.5, `*/*` 0.25) and the best entry wins
//! - weight 0 is an explicit rejection
//! - wildcards never match the internal quad hub type
//!
//! Converter weights and client weights compose multiplicatively; see
//! [`select_output`].

use crate::error::{ConversionError, ConversionResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Reserved hub type for already-parsed quad streams. Never sent over the wire.
pub const INTERNAL_QUADS: &str = "internal/quads";
pub const TEXT_TURTLE: &str = "text/turtle";
pub const APPLICATION_N_TRIPLES: &str = "application/n-triples";
pub const APPLICATION_N_QUADS: &str = "application/n-quads";
pub const APPLICATION_TRIG: &str = "application/trig";
pub const APPLICATION_LD_JSON: &str = "application/ld+json";
pub const APPLICATION_RDF_XML: &str = "application/rdf+xml";
pub const TEXT_N3: &str = "text/n3";

const WILDCARD: &str = "*";
const EXACT_BONUS: f64 = 1.0;
const SUBTYPE_WILDCARD_BONUS: f64 = 0.5;
const FULL_WILDCARD_BONUS: f64 = 0.25;

/// Content type to priority weight, iterated in a deterministic order
pub type MediaTypeWeights = BTreeMap<ContentType, f64>;

/// Normalized `type/subtype[;params]` value.
///
/// Type, subtype and parameter names are lower-cased on parse so that derived
/// equality and ordering are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentType {
    main: String,
    sub: String,
    params: Vec<(String, String)>,
}

impl ContentType {
    pub fn parse(value: &str) -> ConversionResult<Self> {
        let mut parts = split_unquoted(value, ';').into_iter();
        let essence = parts.next().unwrap_or_default().trim();
        let (main, sub) = essence
            .split_once('/')
            .ok_or_else(|| ConversionError::invalid_media_type(value, "missing '/'"))?;
        let main = main.trim().to_ascii_lowercase();
        let sub = sub.trim().to_ascii_lowercase();
        if !is_token(&main) || !is_token(&sub) {
            return Err(ConversionError::invalid_media_type(
                value,
                "type and subtype must be non-empty tokens",
            ));
        }
        if main == WILDCARD && sub != WILDCARD {
            return Err(ConversionError::invalid_media_type(
                value,
                "a wildcard type requires a wildcard subtype",
            ));
        }

        let mut params = Vec::new();
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (name, val) = param.split_once('=').ok_or_else(|| {
                ConversionError::invalid_media_type(value, format!("parameter '{param}' has no value"))
            })?;
            let name = name.trim().to_ascii_lowercase();
            if !is_token(&name) {
                return Err(ConversionError::invalid_media_type(
                    value,
                    format!("invalid parameter name '{name}'"),
                ));
            }
            params.push((name, unquote(val.trim())));
        }
        params.sort();

        Ok(Self { main, sub, params })
    }

    /// The `*/*` pattern
    pub fn any() -> Self {
        Self {
            main: WILDCARD.to_string(),
            sub: WILDCARD.to_string(),
            params: Vec::new(),
        }
    }

    /// `type/subtype` without parameters
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main, self.sub)
    }

    pub fn main_type(&self) -> &str {
        &self.main
    }

    pub fn subtype(&self) -> &str {
        &self.sub
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_wildcard(&self) -> bool {
        self.main == WILDCARD || self.sub == WILDCARD
    }

    pub fn is_internal_quads(&self) -> bool {
        self.main == "internal" && self.sub == "quads"
    }

    /// Same content type with all parameters removed
    pub fn without_params(&self) -> Self {
        Self {
            main: self.main.clone(),
            sub: self.sub.clone(),
            params: Vec::new(),
        }
    }

    /// Specificity bonus if `self`, used as a pattern, matches `candidate`.
    ///
    /// Pattern parameters only rule out a candidate that declares the same
    /// parameter with another value.
    fn match_bonus(&self, candidate: &ContentType) -> Option<f64> {
        // the hub type has to be asked for by name
        if candidate.is_internal_quads() && self.is_wildcard() {
            return None;
        }
        let bonus = if self.main == WILDCARD {
            FULL_WILDCARD_BONUS
        } else if self.main != candidate.main {
            return None;
        } else if self.sub == WILDCARD {
            SUBTYPE_WILDCARD_BONUS
        } else if self.sub == candidate.sub {
            EXACT_BONUS
        } else {
            return None;
        };

        let params_match = self
            .params
            .iter()
            .all(|(name, value)| candidate.param(name).is_none_or(|have| have == value));
        params_match.then_some(bonus)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main, self.sub)?;
        for (name, value) in &self.params {
            if is_token(value) {
                write!(f, ";{name}={value}")?;
            } else {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, ";{name}=\"{escaped}\"")?;
            }
        }
        Ok(())
    }
}

impl FromStr for ContentType {
    type Err = ConversionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for ContentType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ContentType::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+*".contains(c))
}

/// Split on `separator` outside of quoted strings
fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (idx, c) in value.char_indices() {
        if escaped {
            escaped = false;
        } else if quoted && c == '\\' {
            escaped = true;
        } else if c == '"' {
            quoted = !quoted;
        } else if c == separator && !quoted {
            parts.push(&value[start..idx]);
            start = idx + c.len_utf8();
        }
    }
    parts.push(&value[start..]);
    parts
}

/// Strip surrounding quotes and resolve backslash escapes
fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

/// One weighted entry of a client preference list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPreference")]
pub struct Preference {
    pub value: ContentType,
    pub weight: f64,
}

impl Preference {
    /// Weights are clamped to [0, 1]; NaN counts as a rejection.
    pub fn new(value: ContentType, weight: f64) -> Self {
        let weight = if weight.is_nan() {
            0.0
        } else {
            weight.clamp(0.0, 1.0)
        };
        Self { value, weight }
    }

    pub fn parse(value: &str, weight: f64) -> ConversionResult<Self> {
        Ok(Self::new(ContentType::parse(value)?, weight))
    }
}

#[derive(Deserialize)]
struct RawPreference {
    value: ContentType,
    weight: f64,
}

impl From<RawPreference> for Preference {
    fn from(raw: RawPreference) -> Self {
        Preference::new(raw.value, raw.weight)
    }
}

/// Client preferences along the content-type dimension.
///
/// Entry order never affects a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepresentationPreferences {
    #[serde(rename = "type")]
    pub types: Vec<Preference>,
}

impl RepresentationPreferences {
    pub fn new(types: Vec<Preference>) -> Self {
        Self { types }
    }

    /// Preferences accepting exactly one type with weight 1
    pub fn single(content_type: ContentType) -> Self {
        Self::new(vec![Preference::new(content_type, 1.0)])
    }

    pub fn internal_quads() -> Self {
        Self::single(internal_quads())
    }

    /// Parse an HTTP `Accept` header value.
    ///
    /// `q` defaults to 1 and is clamped to [0, 1]. Other parameters stay on the
    /// media type.
    pub fn from_accept_header(header: &str) -> ConversionResult<Self> {
        let mut types = Vec::new();
        for entry in split_unquoted(header, ',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let mut weight = 1.0;
            let mut media_parts = Vec::new();
            for (idx, part) in split_unquoted(entry, ';').into_iter().enumerate() {
                let trimmed = part.trim();
                let q_value = trimmed
                    .split_once('=')
                    .filter(|(name, _)| idx > 0 && name.trim().eq_ignore_ascii_case("q"));
                match q_value {
                    Some((_, raw_q)) => {
                        weight = raw_q.trim().parse::<f64>().map_err(|_| {
                            ConversionError::invalid_media_type(
                                entry,
                                format!("invalid q value '{}'", raw_q.trim()),
                            )
                        })?;
                        if !weight.is_finite() {
                            return Err(ConversionError::invalid_media_type(
                                entry,
                                "q value must be finite",
                            ));
                        }
                    }
                    None => media_parts.push(trimmed),
                }
            }
            let media_type = ContentType::parse(&media_parts.join(";"))?;
            types.push(Preference::new(media_type, weight));
        }
        Ok(Self { types })
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Render back to header form, highest weight first
    pub fn to_accept_header(&self) -> String {
        let mut entries: Vec<&Preference> = self.types.iter().collect();
        entries.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
        entries
            .into_iter()
            .map(|pref| {
                if pref.weight >= 1.0 {
                    pref.value.to_string()
                } else {
                    format!("{};q={}", pref.value, pref.weight)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for RepresentationPreferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_accept_header())
    }
}

pub fn internal_quads() -> ContentType {
    ContentType {
        main: "internal".to_string(),
        sub: "quads".to_string(),
        params: Vec::new(),
    }
}

/// Score `candidate` against `preferences`.
///
/// Returns the best `weight × specificity` over matching entries, or `None`
/// when nothing matches or when a zero-weight entry at least as specific as
/// every positive match rejects the candidate.
pub fn compare(candidate: &ContentType, preferences: &[Preference]) -> Option<f64> {
    let mut best_score: Option<f64> = None;
    let mut best_positive_bonus = 0.0_f64;
    let mut rejection_bonus: Option<f64> = None;

    for pref in preferences {
        let Some(bonus) = pref.value.match_bonus(candidate) else {
            continue;
        };
        if pref.weight <= 0.0 {
            rejection_bonus = Some(rejection_bonus.map_or(bonus, |seen| seen.max(bonus)));
            continue;
        }
        best_positive_bonus = best_positive_bonus.max(bonus);
        let score = pref.weight * bonus;
        best_score = Some(best_score.map_or(score, |seen| seen.max(score)));
    }

    match (best_score, rejection_bonus) {
        (Some(_), Some(rejected)) if rejected >= best_positive_bonus => None,
        (score, _) => score,
    }
}

/// Convert declared weights into a preference list usable with [`compare`]
pub fn weights_as_preferences(weights: &MediaTypeWeights) -> Vec<Preference> {
    weights
        .iter()
        .map(|(content_type, weight)| Preference::new(content_type.clone(), *weight))
        .collect()
}

/// Pick the declared output type that best satisfies the client.
///
/// Each concrete output scores `declared weight × compare(output, preferences)`;
/// the highest positive score wins and equal scores keep the first type in
/// map order.
pub fn select_output(
    outputs: &MediaTypeWeights,
    preferences: &RepresentationPreferences,
) -> Option<(ContentType, f64)> {
    let mut best: Option<(ContentType, f64)> = None;
    for (content_type, weight) in outputs {
        if content_type.is_wildcard() {
            continue;
        }
        let Some(client_score) = compare(content_type, &preferences.types) else {
            continue;
        };
        let score = weight * client_score;
        if score <= 0.0 {
            continue;
        }
        if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
            best = Some((content_type.clone(), score));
        }
    }
    best.map(|(chosen, score)| (with_requested_params(chosen, &preferences.types), score))
}

/// Add the parameters of the strongest exact preference for `chosen`, so a
/// requested JSON-LD `profile` reaches the serializer.
fn with_requested_params(mut chosen: ContentType, preferences: &[Preference]) -> ContentType {
    let mut strongest: Option<&Preference> = None;
    for pref in preferences {
        if pref.weight <= 0.0
            || pref.value.is_wildcard()
            || pref.value.params.is_empty()
            || pref.value.match_bonus(&chosen) != Some(EXACT_BONUS)
        {
            continue;
        }
        if strongest.is_none_or(|current| pref.weight > current.weight) {
            strongest = Some(pref);
        }
    }
    let Some(pref) = strongest else {
        return chosen;
    };
    for (name, value) in &pref.value.params {
        if chosen.param(name).is_none() {
            chosen.params.push((name.clone(), value.clone()));
        }
    }
    chosen.params.sort();
    chosen
}

/// Build a weight map from `(media type, weight)` literals.
pub fn weights<'a>(
    entries: impl IntoIterator<Item = (&'a str, f64)>,
) -> ConversionResult<MediaTypeWeights> {
    entries
        .into_iter()
        .map(|(raw, weight)| Ok((ContentType::parse(raw)?, weight)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ct(value: &str) -> ContentType {
        ContentType::parse(value).unwrap()
    }

    fn pref(value: &str, weight: f64) -> Preference {
        Preference::parse(value, weight).unwrap()
    }

    #[test]
    fn test_parse_normalizes_case_and_params() {
        let parsed = ct("Text/Turtle; Charset=\"UTF-8\"");
        assert_eq!(parsed.essence(), "text/turtle");
        assert_eq!(parsed.param("charset"), Some("UTF-8"));
        assert_eq!(parsed.to_string(), "text/turtle;charset=UTF-8");
        assert_eq!(parsed, ct("text/turtle;charset=UTF-8"));
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        assert!(ContentType::parse("turtle").is_err());
        assert!(ContentType::parse("/turtle").is_err());
        assert!(ContentType::parse("*/turtle").is_err());
        assert!(ContentType::parse("text/turtle;charset").is_err());
    }

    #[test]
    fn test_specificity_composes_with_weight() {
        let prefs = vec![pref("text/*", 0.8), pref("text/turtle", 0.5)];
        // text/* gives 0.8 × 0.5 = 0.4, the exact entry gives 0.5 × 1.0
        assert_eq!(compare(&ct("text/turtle"), &prefs), Some(0.5));
    }

    #[test]
    fn test_full_wildcard_bonus() {
        let prefs = vec![pref("*/*", 1.0)];
        assert_eq!(compare(&ct("application/ld+json"), &prefs), Some(0.25));
    }

    #[test]
    fn test_no_match() {
        let prefs = vec![pref("application/*", 1.0)];
        assert_eq!(compare(&ct("text/turtle"), &prefs), None);
    }

    #[test]
    fn test_zero_weight_rejects_sole_match() {
        let prefs = vec![pref("text/turtle", 0.0)];
        assert_eq!(compare(&ct("text/turtle"), &prefs), None);
    }

    #[test]
    fn test_specific_rejection_beats_wildcard_acceptance() {
        let prefs = vec![pref("*/*", 1.0), pref("text/turtle", 0.0)];
        assert_eq!(compare(&ct("text/turtle"), &prefs), None);
        assert_eq!(compare(&ct("text/html"), &prefs), Some(0.25));
    }

    #[test]
    fn test_wildcard_rejection_does_not_override_exact_acceptance() {
        let prefs = vec![pref("*/*", 0.0), pref("text/turtle", 0.7)];
        assert_eq!(compare(&ct("text/turtle"), &prefs), Some(0.7));
        assert_eq!(compare(&ct("text/html"), &prefs), None);
    }

    #[test]
    fn test_wildcards_never_select_internal_quads() {
        let prefs = vec![pref("*/*", 1.0), pref("internal/*", 1.0)];
        assert_eq!(compare(&internal_quads(), &prefs), None);
        assert_eq!(compare(&internal_quads(), &[pref(INTERNAL_QUADS, 1.0)]), Some(1.0));
    }

    #[test]
    fn test_pattern_params_only_conflict_on_different_values() {
        let prefs = vec![pref("text/turtle;charset=utf-8", 1.0)];
        assert_eq!(compare(&ct("text/turtle"), &prefs), Some(1.0));
        assert_eq!(compare(&ct("text/turtle;charset=utf-8"), &prefs), Some(1.0));
        assert_eq!(compare(&ct("text/turtle;charset=latin1"), &prefs), None);
    }

    #[test]
    fn test_selected_output_carries_requested_params() {
        let outputs = weights([("text/turtle", 1.0), ("application/ld+json", 0.8)]).unwrap();
        let prefs = RepresentationPreferences::from_accept_header(
            "application/ld+json;profile=\"http://www.w3.org/ns/json-ld#compacted\"",
        )
        .unwrap();
        let (chosen, score) = select_output(&outputs, &prefs).unwrap();
        assert_eq!(chosen.essence(), "application/ld+json");
        assert_eq!(
            chosen.param("profile"),
            Some("http://www.w3.org/ns/json-ld#compacted")
        );
        assert!((score - 0.8).abs() < 1e-9);

        // wildcard matches add nothing
        let prefs = RepresentationPreferences::from_accept_header("text/*;charset=utf-8").unwrap();
        let (chosen, _) = select_output(&outputs, &prefs).unwrap();
        assert_eq!(chosen, ct("text/turtle"));
    }

    #[test]
    fn test_quoted_values_keep_separators() {
        let parsed = ct("application/ld+json; profile=\"a;b, c\"");
        assert_eq!(parsed.param("profile"), Some("a;b, c"));
        assert_eq!(parsed.to_string(), "application/ld+json;profile=\"a;b, c\"");
        assert_eq!(ct(&parsed.to_string()), parsed);

        let prefs = RepresentationPreferences::from_accept_header(
            "application/ld+json;profile=\"x,y\";q=0.5, text/turtle",
        )
        .unwrap();
        assert_eq!(prefs.types.len(), 2);
        assert_eq!(prefs.types[0].value.param("profile"), Some("x,y"));
        assert_eq!(prefs.types[0].weight, 0.5);
    }

    #[test]
    fn test_deserialized_weights_are_clamped() {
        let parsed: RepresentationPreferences = serde_json::from_str(
            r#"{"type":[{"value":"text/turtle","weight":1.5},{"value":"text/*","weight":-1}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.types[0].weight, 1.0);
        assert_eq!(parsed.types[1].weight, 0.0);
        assert_eq!(Preference::new(ct("text/turtle"), f64::NAN).weight, 0.0);
    }

    #[test]
    fn test_accept_header_parsing() {
        let prefs =
            RepresentationPreferences::from_accept_header("text/turtle;q=0.8, application/*;q=0.2, */*")
                .unwrap();
        assert_eq!(prefs.types.len(), 3);
        assert_eq!(prefs.types[0], pref("text/turtle", 0.8));
        assert_eq!(prefs.types[1], pref("application/*", 0.2));
        assert_eq!(prefs.types[2], pref("*/*", 1.0));
    }

    #[test]
    fn test_accept_header_rejects_bad_q() {
        assert!(RepresentationPreferences::from_accept_header("text/turtle;q=high").is_err());
    }

    #[test]
    fn test_select_output_multiplies_weights() {
        let outputs = weights([("text/turtle", 1.0), ("application/ld+json", 0.9)]).unwrap();
        let prefs = RepresentationPreferences::new(vec![
            pref("text/turtle", 0.5),
            pref("application/ld+json", 0.6),
        ]);
        let (chosen, score) = select_output(&outputs, &prefs).unwrap();
        assert_eq!(chosen, ct("application/ld+json"));
        assert!((score - 0.54).abs() < 1e-9);
    }

    #[test]
    fn test_select_output_ignores_rejected_types() {
        let outputs = weights([("text/turtle", 1.0)]).unwrap();
        let prefs = RepresentationPreferences::new(vec![pref("text/turtle", 0.0)]);
        assert!(select_output(&outputs, &prefs).is_none());
    }
}

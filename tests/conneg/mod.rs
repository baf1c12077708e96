//! Shared fixtures for conversion integration tests

#![allow(dead_code)]

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use ldp_conneg::conversion::media_type::{ContentType, Preference, RepresentationPreferences};
use ldp_conneg::{ConversionResult, Representation, RepresentationMetadata, ResourceIdentifier};
use oxigraph::model::{GraphName, NamedNode, Quad};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const TRIPLE_TURTLE: &str = "<http://test.com/s> <http://test.com/p> <http://test.com/o>.";
pub const TRIPLE_JSON_LD: &str =
    r#"{"@id":"http://test.com/s","http://test.com/p":{"@id":"http://test.com/o"}}"#;
pub const TRIPLE_N_TRIPLES: &str = "<http://test.com/s> <http://test.com/p> <http://test.com/o> .";
pub const TRUNCATED_TURTLE: &str = "<http://test.com/s> <http://test.com/p> <http://test.co";

/// Default graph with a blank node and language-tagged literals
pub const GRAPH_TURTLE: &str = r#"@prefix ex: <http://test.com/> .
ex:s ex:label "hello"@en, "bonjour"@fr ;
    ex:knows _:someone .
_:someone ex:name "Someone" ;
    ex:age 42 .
"#;

/// Triples only IRIs and literals can express, for syntaxes without blank node labels
pub const IRI_TURTLE: &str = r#"@prefix ex: <http://test.com/> .
ex:s ex:label "hello"@en, "bonjour"@fr ;
    ex:knows ex:o .
ex:o ex:name "Someone" .
"#;

/// Default and named graphs sharing a blank node
pub const DATASET_TRIG: &str = r#"@prefix ex: <http://test.com/> .
ex:s ex:p ex:o .
ex:g1 {
    ex:s ex:label "hallo"@de ;
        ex:knows _:someone .
}
ex:g2 {
    _:someone ex:name "Someone" .
}
"#;

/// Quads as a multiset of strings with blank node labels erased.
///
/// Sound for isomorphism only while a fixture holds at most one blank node.
pub fn shape(quads: &[Quad]) -> BTreeMap<String, usize> {
    fn term(value: String) -> String {
        if value.starts_with("_:") {
            "_:b".to_string()
        } else {
            value
        }
    }
    let mut shape = BTreeMap::new();
    for quad in quads {
        let key = format!(
            "{} {} {} {}",
            term(quad.subject.to_string()),
            quad.predicate,
            term(quad.object.to_string()),
            term(quad.graph_name.to_string()),
        );
        *shape.entry(key).or_insert(0) += 1;
    }
    shape
}

pub fn ct(value: &str) -> ContentType {
    ContentType::parse(value).expect("valid media type")
}

pub fn prefs(value: &str, weight: f64) -> RepresentationPreferences {
    RepresentationPreferences::new(vec![Preference::new(ct(value), weight)])
}

pub fn quad(s: &str, p: &str, o: &str) -> Quad {
    Quad::new(
        NamedNode::new_unchecked(s),
        NamedNode::new_unchecked(p),
        NamedNode::new_unchecked(o),
        GraphName::DefaultGraph,
    )
}

pub fn test_triple() -> Quad {
    quad("http://test.com/s", "http://test.com/p", "http://test.com/o")
}

pub fn document(content_type: &str, body: &str) -> Representation {
    Representation::from_chunks(
        ResourceIdentifier::new("http://test.com/doc"),
        ct(content_type),
        [Bytes::copy_from_slice(body.as_bytes())],
    )
}

/// Turtle body with `count` triples, one per line
pub fn many_triples(count: usize) -> String {
    (0..count)
        .map(|i| format!("<http://test.com/s{i}> <http://test.com/p> \"value {i}\" .\n"))
        .collect()
}

/// Sets a flag when dropped
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Byte stream over `body` split into `chunk_size` pieces; `released` is set
/// once the stream has been dropped.
pub fn tracked_body(
    body: String,
    chunk_size: usize,
    released: Arc<AtomicBool>,
) -> BoxStream<'static, ConversionResult<Bytes>> {
    let guard = DropFlag(released);
    let chunks: Vec<Bytes> = body
        .into_bytes()
        .chunks(chunk_size)
        .map(Bytes::copy_from_slice)
        .collect();
    stream::iter(chunks)
        .map(move |chunk| {
            let _held = &guard;
            Ok(chunk)
        })
        .boxed()
}

pub fn tracked_document(content_type: &str, body: String, released: Arc<AtomicBool>) -> Representation {
    Representation::binary(
        ResourceIdentifier::new("http://test.com/doc"),
        RepresentationMetadata::new(ct(content_type)),
        tracked_body(body, 64, released),
    )
}

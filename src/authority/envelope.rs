//! Result extraction from the authority's SOAP envelope.
//!
//! # Strategies (first non-empty match wins)
//! 1. `{NFeAutorizacao4}nfeAutorizacaoLoteResult` → its first child element
//! 2. `{nfe}retEnviNFe` anywhere in the envelope
//! 3. any `nfeAutorizacaoLoteResult` by local name → its first child element
//! 4. first child element of the SOAP 1.1 or 1.2 `Body`
//!
//! Matches are returned as the verbatim source slice. An empty match falls
//! through to the next strategy; nothing is ever returned empty.

use roxmltree::{Document, Node};
use thiserror::Error;

pub const WSDL_NS: &str = "http://www.portalfiscal.inf.br/nfe/wsdl/NFeAutorizacao4";
pub const NFE_NS: &str = "http://www.portalfiscal.inf.br/nfe";
pub const SOAP11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

const RESULT_ELEMENT: &str = "nfeAutorizacaoLoteResult";
const LEGACY_ELEMENT: &str = "retEnviNFe";

/// The envelope did not yield a result document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("unrecognized envelope structure")]
    Unrecognized,

    #[error("result element located but empty")]
    Empty,
}

/// Locate the embedded result document inside `envelope`.
pub fn extract(envelope: &str) -> Result<String, ExtractionError> {
    let doc = Document::parse(envelope).map_err(|e| ExtractionError::Malformed(e.to_string()))?;
    let mut located = false;

    let candidates = [
        ("qualified result", find(&doc, |n| n.has_tag_name((WSDL_NS, RESULT_ELEMENT))), true),
        ("legacy result", find(&doc, |n| n.has_tag_name((NFE_NS, LEGACY_ELEMENT))), false),
        ("local-name result", find(&doc, |n| n.tag_name().name() == RESULT_ELEMENT), true),
        ("body fallback", find(&doc, is_soap_body), true),
    ];

    for (strategy, node, unwrap_child) in candidates {
        let Some(node) = node else {
            continue;
        };
        located = true;

        let content = if unwrap_child {
            wrapped_content(node, envelope)
        } else {
            element_content(node, envelope)
        };
        if let Some(content) = content {
            tracing::debug!(strategy, "Extracted authority result");
            return Ok(content);
        }
        tracing::debug!(strategy, "Match was empty, trying next strategy");
    }

    if located {
        Err(ExtractionError::Empty)
    } else {
        Err(ExtractionError::Unrecognized)
    }
}

fn find<'a, 'input, P>(doc: &'a Document<'input>, predicate: P) -> Option<Node<'a, 'input>>
where
    P: Fn(&Node<'a, 'input>) -> bool,
{
    doc.descendants().find(|n| n.is_element() && predicate(n))
}

fn is_soap_body(node: &Node<'_, '_>) -> bool {
    node.has_tag_name((SOAP11_NS, "Body")) || node.has_tag_name((SOAP12_NS, "Body"))
}

/// The element itself, if it carries any child element or text.
fn element_content(node: Node<'_, '_>, source: &str) -> Option<String> {
    let has_children = node.children().any(|c| c.is_element());
    let has_text = node
        .children()
        .filter_map(|c| c.text())
        .any(|t| !t.trim().is_empty());
    (has_children || has_text).then(|| source[node.range()].to_string())
}

/// The first child element of a wrapper; an escaped text payload otherwise.
fn wrapped_content(wrapper: Node<'_, '_>, source: &str) -> Option<String> {
    if let Some(child) = wrapper.first_element_child() {
        return element_content(child, source);
    }
    let text: String = wrapper.children().filter_map(|c| c.text()).collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

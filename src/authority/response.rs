//! Authority result document → JSON outcome.

use roxmltree::{Document, Node};
use serde_json::{Map, Value};

use crate::authority::envelope::ExtractionError;

/// Status code the authority uses for an authorized document.
pub const AUTHORIZED_CODE: &str = "100";

/// Interpret an extracted result document.
///
/// Protocol details (`infProt`) win over the batch-level status. Elements are
/// matched by local name.
pub fn parse_result(xml: &str) -> Result<Value, ExtractionError> {
    let doc = Document::parse(xml).map_err(|e| ExtractionError::Malformed(e.to_string()))?;
    let root = doc.root_element();

    let scope = root
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "infProt")
        .unwrap_or(root);

    let code = text_of(scope, "cStat").ok_or(ExtractionError::Unrecognized)?;
    let message = text_of(scope, "xMotivo");

    let mut out = Map::new();
    if code == AUTHORIZED_CODE {
        out.insert("status".into(), "AUTHORIZED".into());
        insert_opt(&mut out, "protocol", text_of(scope, "nProt"));
        insert_opt(&mut out, "access_key", text_of(scope, "chNFe"));
        insert_opt(&mut out, "authorized_at", text_of(scope, "dhRecbto"));
    } else {
        out.insert("status".into(), "REJECTED".into());
    }
    out.insert("code".into(), code.into());
    insert_opt(&mut out, "message", message);

    Ok(Value::Object(out))
}

fn text_of(scope: Node<'_, '_>, name: &str) -> Option<String> {
    scope
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn insert_opt(out: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        out.insert(key.to_string(), Value::String(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_authorized_protocol() {
        let xml = r#"<retEnviNFe xmlns="http://www.portalfiscal.inf.br/nfe">
            <cStat>104</cStat><xMotivo>Lote processado</xMotivo>
            <protNFe><infProt>
                <chNFe>35240112345678000199550010000000011000000010</chNFe>
                <dhRecbto>2024-01-01T12:00:00-03:00</dhRecbto>
                <nProt>135240000000001</nProt>
                <cStat>100</cStat><xMotivo>Autorizado o uso da NF-e</xMotivo>
            </infProt></protNFe>
        </retEnviNFe>"#;

        assert_eq!(
            parse_result(xml).unwrap(),
            json!({
                "status": "AUTHORIZED",
                "code": "100",
                "message": "Autorizado o uso da NF-e",
                "protocol": "135240000000001",
                "access_key": "35240112345678000199550010000000011000000010",
                "authorized_at": "2024-01-01T12:00:00-03:00",
            })
        );
    }

    #[test]
    fn test_rejection_keeps_code_and_reason() {
        let xml = r#"<retEnviNFe><cStat>225</cStat><xMotivo>Falha no Schema XML</xMotivo></retEnviNFe>"#;
        assert_eq!(
            parse_result(xml).unwrap(),
            json!({"status": "REJECTED", "code": "225", "message": "Falha no Schema XML"})
        );
    }

    #[test]
    fn test_missing_status_code_is_unrecognized() {
        assert_eq!(parse_result("<retEnviNFe/>"), Err(ExtractionError::Unrecognized));
    }

    #[test]
    fn test_malformed_result() {
        assert!(matches!(parse_result("not xml"), Err(ExtractionError::Malformed(_))));
    }
}

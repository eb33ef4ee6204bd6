//! Outbound artifact construction.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("payload must be a JSON object")]
    NotAnObject,

    #[error("'{0}' is not a valid element name")]
    InvalidName(String),
}

/// Turns an input payload into the document submitted to the authority. Pure.
pub trait ArtifactBuilder: Send + Sync {
    fn build(&self, payload: &Value) -> Result<String, BuildError>;
}

/// Renders a JSON object as nested XML elements.
///
/// Arrays repeat their element, `null` is omitted, scalars become text.
#[derive(Debug, Clone)]
pub struct PayloadXmlBuilder {
    root: String,
    namespace: Option<String>,
}

impl PayloadXmlBuilder {
    pub fn new(root: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            root: root.into(),
            namespace,
        }
    }
}

impl ArtifactBuilder for PayloadXmlBuilder {
    fn build(&self, payload: &Value) -> Result<String, BuildError> {
        let fields = payload.as_object().ok_or(BuildError::NotAnObject)?;
        check_name(&self.root)?;

        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        out.push('<');
        out.push_str(&self.root);
        if let Some(ns) = &self.namespace {
            out.push_str(" xmlns=\"");
            escape_into(&mut out, ns);
            out.push('"');
        }
        out.push('>');
        write_fields(&mut out, fields)?;
        out.push_str("</");
        out.push_str(&self.root);
        out.push('>');
        Ok(out)
    }
}

fn write_fields(out: &mut String, fields: &Map<String, Value>) -> Result<(), BuildError> {
    for (name, value) in fields {
        check_name(name)?;
        write_value(out, name, value)?;
    }
    Ok(())
}

fn write_value(out: &mut String, name: &str, value: &Value) -> Result<(), BuildError> {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                write_value(out, name, item)?;
            }
        }
        Value::Object(fields) => {
            open(out, name);
            write_fields(out, fields)?;
            close(out, name);
        }
        Value::String(s) => {
            open(out, name);
            escape_into(out, s);
            close(out, name);
        }
        Value::Bool(_) | Value::Number(_) => {
            open(out, name);
            out.push_str(&value.to_string());
            close(out, name);
        }
    }
    Ok(())
}

fn open(out: &mut String, name: &str) {
    out.push('<');
    out.push_str(name);
    out.push('>');
}

fn close(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn check_name(name: &str) -> Result<(), BuildError> {
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid_start && valid_rest && !name.to_ascii_lowercase().starts_with("xml") {
        Ok(())
    } else {
        Err(BuildError::InvalidName(name.to_string()))
    }
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

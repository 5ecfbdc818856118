//! In-memory model of the legacy XML export.
//!
//! The export is small enough to hold entirely in memory, so the reader
//! builds a plain element tree first and the pipeline walks it with path
//! queries. Text nodes are ignored; every value the format carries lives
//! in attributes.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use thiserror::Error;

/// The document could not be read or is structurally unusable.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("cannot read document: {0}")]
    Io(#[from] std::io::Error),
    /// The XML is malformed.
    #[error("malformed document: {0}")]
    Syntax(String),
    /// A node the pipeline requires is absent.
    #[error("missing node '{path}'")]
    MissingNode {
        /// Slash-separated path from the document root.
        path: String,
    },
    /// A required attribute is absent.
    #[error("missing attribute '{name}' on <{node}>")]
    MissingAttribute {
        /// Element name.
        node: String,
        /// Attribute name.
        name: String,
    },
}

/// One XML element: name, attributes, child elements.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Node {
    /// Element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value, if present.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value, or a [`DocumentError::MissingAttribute`].
    ///
    /// # Errors
    ///
    /// When the attribute is absent.
    pub fn require_attr(&self, name: &str) -> Result<&str, DocumentError> {
        self.attr(name).ok_or_else(|| DocumentError::MissingAttribute {
            node: self.name.clone(),
            name: name.to_string(),
        })
    }

    /// Child elements with the given name, in document order.
    #[must_use]
    pub fn children(&self, name: &str) -> Vec<&Node> {
        self.children.iter().filter(|c| c.name == name).collect()
    }

    /// First child element with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child element with the given name, or a
    /// [`DocumentError::MissingNode`].
    ///
    /// # Errors
    ///
    /// When no such child exists.
    pub fn require_child(&self, name: &str) -> Result<&Node, DocumentError> {
        self.child(name).ok_or_else(|| DocumentError::MissingNode {
            path: format!("{}/{name}", self.name),
        })
    }
}

/// A parsed export document.
#[derive(Debug, Clone)]
pub struct ExportDocument {
    root: Node,
}

impl ExportDocument {
    /// Parse a document from its XML text.
    ///
    /// # Errors
    ///
    /// [`DocumentError::Syntax`] for malformed XML or a missing root
    /// element.
    pub fn parse(xml: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Node> = Vec::new();
        let mut root: Option<Node> = None;
        loop {
            match reader.read_event() {
                Ok(Event::Start(element)) => stack.push(node_from(&element)?),
                Ok(Event::Empty(element)) => {
                    let node = node_from(&element)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Ok(Event::End(_)) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| DocumentError::Syntax("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, node)?;
                }
                Ok(Event::Eof) => break,
                // Text, comments, declarations carry nothing we use.
                Ok(_) => {}
                Err(err) => return Err(DocumentError::Syntax(err.to_string())),
            }
        }
        if !stack.is_empty() {
            return Err(DocumentError::Syntax("unclosed element".to_string()));
        }
        let root = root.ok_or_else(|| DocumentError::Syntax("empty document".to_string()))?;
        Ok(Self { root })
    }

    /// Read and parse a document from a file.
    ///
    /// # Errors
    ///
    /// I/O failures and everything [`Self::parse`] reports.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml)
    }

    /// The root element.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// All elements matching a slash-separated path below the root,
    /// in document order.
    #[must_use]
    pub fn select(&self, path: &str) -> Vec<&Node> {
        let mut current = vec![&self.root];
        for segment in path.split('/') {
            current = current
                .into_iter()
                .flat_map(|node| node.children(segment))
                .collect();
        }
        current
    }

    /// The single element matching a slash-separated path.
    ///
    /// # Errors
    ///
    /// [`DocumentError::MissingNode`] when the path matches nothing.
    pub fn select_one(&self, path: &str) -> Result<&Node, DocumentError> {
        self.select(path)
            .into_iter()
            .next()
            .ok_or_else(|| DocumentError::MissingNode {
                path: path.to_string(),
            })
    }
}

fn node_from(element: &BytesStart<'_>) -> Result<Node, DocumentError> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|err| DocumentError::Syntax(err.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| DocumentError::Syntax(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Node {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [Node],
    root: &mut Option<Node>,
    node: Node,
) -> Result<(), DocumentError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    if root.is_some() {
        return Err(DocumentError::Syntax(
            "multiple root elements".to_string(),
        ));
    }
    *root = Some(node);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<grisbi-export version="0.5">
  <payees count="2">
    <payee id="1" name="Acme &amp; Co"/>
  </payees>
  <accounts>
    <account id="1" name="Checking">
      <transactions count="0"/>
    </account>
  </accounts>
</grisbi-export>"#;

    #[test]
    fn test_parse_builds_tree() {
        let doc = ExportDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.root().name(), "grisbi-export");
        assert_eq!(doc.root().attr("version"), Some("0.5"));
    }

    #[test]
    fn test_attributes_are_unescaped() {
        let doc = ExportDocument::parse(SAMPLE).unwrap();
        let payee = doc.select_one("payees/payee").unwrap();
        assert_eq!(payee.attr("name"), Some("Acme & Co"));
    }

    #[test]
    fn test_select_path() {
        let doc = ExportDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.select("accounts/account").len(), 1);
        assert_eq!(doc.select("accounts/nonexistent").len(), 0);
        let account = doc.select_one("accounts/account").unwrap();
        let txns = account.require_child("transactions").unwrap();
        assert_eq!(txns.attr("count"), Some("0"));
    }

    #[test]
    fn test_missing_node_and_attribute() {
        let doc = ExportDocument::parse(SAMPLE).unwrap();
        assert!(matches!(
            doc.select_one("currencies"),
            Err(DocumentError::MissingNode { .. })
        ));
        let payee = doc.select_one("payees/payee").unwrap();
        assert!(matches!(
            payee.require_attr("iso-code"),
            Err(DocumentError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_malformed_document_rejected() {
        assert!(matches!(
            ExportDocument::parse("<a><b></a>"),
            Err(DocumentError::Syntax(_))
        ));
        assert!(matches!(
            ExportDocument::parse(""),
            Err(DocumentError::Syntax(_))
        ));
    }
}

//! Wire XML tree: parsing and text emission.
//!
//! Uses quick-xml which is safe against XXE by default (doesn't expand
//! entities). Every element and attribute name is reduced to its local part
//! while the tree is built, so schema-aware processing never sees namespace
//! prefixes regardless of how the client chose to qualify names.

use crate::error::{xml_escape, SchemaError};
use quick_xml::events::Event;
use quick_xml::Reader;

/// A node of a wire document tree.
///
/// Produced by [`parse_document`] (with normalized names) and built by the
/// marshalling engine's encode (with the names to be written verbatim).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub text: Option<String>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Whether this node carries the wire-level nil marker.
    pub fn is_nil(&self) -> bool {
        matches!(self.attr("nil"), Some("true") | Some("1"))
    }

    /// Compact single-line XML text.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, None, 0);
        out
    }

    /// Indented XML text.
    pub fn to_pretty_xml(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, Some(2), 0);
        out
    }

    fn write(&self, out: &mut String, indent: Option<usize>, depth: usize) {
        let pad = |out: &mut String, depth: usize| {
            if let Some(width) = indent {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&" ".repeat(width * depth));
            }
        };

        pad(out, depth);
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&xml_escape(v));
            out.push('"');
        }

        if self.children.is_empty() && self.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');

        if let Some(text) = &self.text {
            out.push_str(&xml_escape(text));
        }
        for child in &self.children {
            child.write(out, indent, depth + 1);
        }
        if !self.children.is_empty() {
            pad(out, depth);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// Local part of a possibly prefix-qualified name.
pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Parse wire bytes into a node tree with prefix-normalized names.
pub fn parse_document(xml: &str) -> Result<XmlNode, SchemaError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if stack.is_empty() && root.is_some() {
                    return Err(SchemaError::Xml("multiple root elements".to_string()));
                }
                stack.push(node_from_start(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let node = node_from_start(e)?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| SchemaError::Xml("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| SchemaError::Xml(err.to_string()))?;
                append_text(&mut stack, &text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                append_text(&mut stack, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SchemaError::Xml(e.to_string())),
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(SchemaError::Xml("unclosed element".to_string()));
    }
    root.ok_or_else(|| SchemaError::Xml("no root element".to_string()))
}

fn node_from_start(e: &quick_xml::events::BytesStart<'_>) -> Result<XmlNode, SchemaError> {
    let raw_name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| SchemaError::Xml(err.to_string()))?
        .to_string();
    let mut node = XmlNode::new(local_name(&raw_name));
    for attr in e.attributes().flatten() {
        let key = std::str::from_utf8(attr.key.as_ref()).unwrap_or("");
        let value = attr
            .unescape_value()
            .map_err(|err| SchemaError::Xml(err.to_string()))?;
        node.set_attr(local_name(key), value.into_owned());
    }
    Ok(node)
}

fn attach(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
) -> Result<(), SchemaError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else {
        if root.is_some() {
            return Err(SchemaError::Xml("multiple root elements".to_string()));
        }
        *root = Some(node);
    }
    Ok(())
}

fn append_text(stack: &mut [XmlNode], text: &str) {
    if let Some(current) = stack.last_mut() {
        match &mut current.text {
            Some(existing) => existing.push_str(text),
            None => current.text = Some(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOAP_SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns:tns="http://example.org/svc">
  <soap:Body>
    <tns:lookupRequest>
      <tns:token>abc</tns:token>
      <tns:firstName>Smith</tns:firstName>
      <tns:note xsi:nil="true"/>
    </tns:lookupRequest>
  </soap:Body>
</soap:Envelope>"#;

    #[test]
    fn test_parse_strips_prefixes() {
        let doc = parse_document(SOAP_SAMPLE).unwrap();
        assert_eq!(doc.name, "Envelope");
        let body = doc.child("Body").unwrap();
        let request = body.child("lookupRequest").unwrap();
        assert_eq!(
            request.child("token").unwrap().text.as_deref(),
            Some("abc")
        );
        assert_eq!(
            request.child("firstName").unwrap().text.as_deref(),
            Some("Smith")
        );
    }

    #[test]
    fn test_nil_marker() {
        let doc = parse_document(SOAP_SAMPLE).unwrap();
        let request = doc.child("Body").unwrap().child("lookupRequest").unwrap();
        assert!(request.child("note").unwrap().is_nil());
        assert!(!request.child("token").unwrap().is_nil());
    }

    #[test]
    fn test_repeated_children() {
        let doc = parse_document("<list><item>1</item><item>2</item><other/></list>").unwrap();
        let items: Vec<_> = doc.children_named("item").collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text.as_deref(), Some("2"));
    }

    #[test]
    fn test_text_entities_unescaped() {
        let doc = parse_document("<v>a &lt; b &amp; c</v>").unwrap();
        assert_eq!(doc.text.as_deref(), Some("a < b & c"));
    }

    #[test]
    fn test_cdata_text() {
        let doc = parse_document("<v><![CDATA[<raw>]]></v>").unwrap();
        assert_eq!(doc.text.as_deref(), Some("<raw>"));
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(matches!(
            parse_document("<a><b></a>"),
            Err(SchemaError::Xml(_))
        ));
        assert!(matches!(parse_document(""), Err(SchemaError::Xml(_))));
    }

    #[test]
    fn test_to_xml_escapes_and_round_trips() {
        let mut node = XmlNode::new("msg");
        node.set_attr("kind", "a\"b");
        node.children.push(XmlNode::with_text("body", "x < y"));
        let xml = node.to_xml();
        assert_eq!(xml, "<msg kind=\"a&quot;b\"><body>x &lt; y</body></msg>");

        let parsed = parse_document(&xml).unwrap();
        assert_eq!(parsed.child("body").unwrap().text.as_deref(), Some("x < y"));
    }

    #[test]
    fn test_empty_node_self_closes() {
        assert_eq!(XmlNode::new("empty").to_xml(), "<empty/>");
    }

    #[test]
    fn test_pretty_output_indents() {
        let mut root = XmlNode::new("a");
        root.children.push(XmlNode::with_text("b", "1"));
        let pretty = root.to_pretty_xml();
        assert_eq!(pretty, "<a>\n  <b>1</b>\n</a>");
    }
}

//! The marshalling engine: recursive decode/encode between wire documents
//! and native value trees, driven by the schema registry.
//!
//! Both directions are pure, synchronous tree transformations over the
//! immutable registry; any number of calls may run concurrently. The first
//! error met anywhere in the recursion short-circuits the whole call.

use crate::error::SchemaError;
use crate::primitives::{self, PrimitiveType};
use crate::schema::{FieldDef, Occurs, SchemaRegistry, TypeDef};
use crate::value::Value;
use crate::xml::XmlNode;
use std::collections::HashMap;

pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Schema-driven codec over a registry snapshot.
pub struct SchemaCodec<'a> {
    registry: &'a SchemaRegistry,
    target_namespace: &'a str,
}

impl<'a> SchemaCodec<'a> {
    pub fn new(registry: &'a SchemaRegistry, target_namespace: &'a str) -> Self {
        Self {
            registry,
            target_namespace,
        }
    }

    /// Decode a wire document into a value tree.
    ///
    /// `root_type` must name a registered element. The envelope/body framing
    /// is located and stripped, then the body child named after the root
    /// type is converted under that type's field sequence.
    pub fn decode(&self, xml: &str, root_type: &str) -> Result<Value, SchemaError> {
        let root_def = self.registry.resolve_element(root_type)?;
        let doc = crate::xml::parse_document(xml)?;

        if doc.name != "Envelope" {
            return Err(SchemaError::InvalidEnvelope(format!(
                "expected Envelope, found \"{}\"",
                doc.name
            )));
        }
        let body = doc
            .child("Body")
            .ok_or_else(|| SchemaError::InvalidEnvelope("missing Body".to_string()))?;
        let payload = body.child(root_type).ok_or_else(|| {
            SchemaError::InvalidEnvelope(format!("body does not contain \"{root_type}\""))
        })?;

        self.decode_node(root_def, Some(payload))
    }

    fn decode_node(&self, def: &TypeDef, node: Option<&XmlNode>) -> Result<Value, SchemaError> {
        let mut out = HashMap::with_capacity(def.sequence.len());
        for (field_name, field) in &def.sequence {
            let value = match PrimitiveType::from_name(&field.type_name) {
                Some(ptype) => self.decode_primitive(ptype, field_name, field, node)?,
                None => self.decode_composite(field_name, field, node)?,
            };
            out.insert(field_name.clone(), value);
        }
        Ok(Value::Struct(out))
    }

    fn decode_primitive(
        &self,
        ptype: PrimitiveType,
        field_name: &str,
        field: &FieldDef,
        node: Option<&XmlNode>,
    ) -> Result<Value, SchemaError> {
        let child = node.and_then(|n| n.child(field_name));
        match child {
            None => {
                if field.is_required() {
                    return Err(SchemaError::RequiredFieldMissing(field_name.to_string()));
                }
                Ok(Value::Null)
            }
            Some(c) if c.is_nil() => Ok(Value::Null),
            Some(c) => match c.text.as_deref() {
                // An element with no text payload carries no value.
                None | Some("") => Ok(Value::Null),
                Some(text) => primitives::decode(ptype, field_name, text, &field.facets),
            },
        }
    }

    fn decode_composite(
        &self,
        field_name: &str,
        field: &FieldDef,
        node: Option<&XmlNode>,
    ) -> Result<Value, SchemaError> {
        let nested = self.registry.resolve(&field.type_name)?;

        // Conforming clients send field-named children; our own encode
        // output carries type-named branches. Accept either.
        let occurrences: Vec<&XmlNode> = match node {
            Some(n) => {
                let by_field: Vec<&XmlNode> = n.children_named(field_name).collect();
                if by_field.is_empty() {
                    n.children_named(&field.type_name).collect()
                } else {
                    by_field
                }
            }
            None => Vec::new(),
        };

        if field.is_list() {
            // Every occurrence present is decoded; no truncation on input.
            let mut items = Vec::new();
            if occurrences.is_empty() {
                items.push(self.decode_node(nested, None)?);
            } else {
                for occurrence in occurrences {
                    items.push(self.decode_node(nested, Some(occurrence))?);
                }
            }
            Ok(Value::List(items))
        } else {
            // Absence substitutes an empty composite; only required
            // primitive leaves turn absence into an error.
            self.decode_node(nested, occurrences.first().copied())
        }
    }

    /// Encode a value tree into an envelope-framed wire document.
    pub fn encode(&self, value: Option<&Value>, type_name: &str) -> Result<XmlNode, SchemaError> {
        let mut envelope = XmlNode::new("soap:Envelope");
        envelope.set_attr("xmlns:xsi", XSI_NS);
        envelope.set_attr("xmlns:xsd", XSD_NS);
        envelope.set_attr("xmlns:soap", SOAP_ENVELOPE_NS);

        let mut body = XmlNode::new("soap:Body");
        body.children.push(self.encode_branch(value, type_name, true)?);
        envelope.children.push(body);
        Ok(envelope)
    }

    /// Encode a value tree without the envelope framing.
    pub fn encode_bare(
        &self,
        value: Option<&Value>,
        type_name: &str,
    ) -> Result<XmlNode, SchemaError> {
        self.encode_branch(value, type_name, true)
    }

    fn encode_branch(
        &self,
        value: Option<&Value>,
        type_name: &str,
        is_root: bool,
    ) -> Result<XmlNode, SchemaError> {
        let def = self.registry.resolve(type_name)?;
        let mut branch = XmlNode::new(type_name);
        if is_root {
            branch.set_attr("xmlns", self.target_namespace);
        }
        // With no input value at all, only the opened branch is written.
        let Some(value) = value else {
            return Ok(branch);
        };

        for (field_name, field) in &def.sequence {
            let field_value = value.get(field_name);
            match PrimitiveType::from_name(&field.type_name) {
                Some(ptype) => {
                    branch
                        .children
                        .push(self.encode_primitive(ptype, field_name, field, field_value)?);
                }
                None => self.encode_composite(&mut branch, field, field_value)?,
            }
        }
        Ok(branch)
    }

    fn encode_primitive(
        &self,
        ptype: PrimitiveType,
        field_name: &str,
        field: &FieldDef,
        value: Option<&Value>,
    ) -> Result<XmlNode, SchemaError> {
        match value {
            // Explicit null gets the nil marker, distinct from absence.
            Some(Value::Null) => {
                let mut node = XmlNode::new(field_name);
                node.set_attr("xsi:nil", "true");
                Ok(node)
            }
            Some(v) => {
                let text = primitives::encode(ptype, field_name, v, &field.facets)?;
                Ok(XmlNode::with_text(field_name, text))
            }
            None => Ok(XmlNode::new(field_name)),
        }
    }

    fn encode_composite(
        &self,
        branch: &mut XmlNode,
        field: &FieldDef,
        value: Option<&Value>,
    ) -> Result<(), SchemaError> {
        match value {
            Some(Value::List(items)) if field.is_list() => {
                // Finite bounds above one truncate; unbounded writes all.
                let take = match field.max_occurs {
                    Occurs::Unbounded => items.len(),
                    Occurs::Bounded(max) => items.len().min(max as usize),
                };
                for item in &items[..take] {
                    branch
                        .children
                        .push(self.encode_branch(Some(item), &field.type_name, false)?);
                }
            }
            Some(Value::List(items)) => {
                // A list where a scalar was expected: first element wins.
                branch
                    .children
                    .push(self.encode_branch(items.first(), &field.type_name, false)?);
            }
            other => {
                branch
                    .children
                    .push(self.encode_branch(other, &field.type_name, false)?);
            }
        }
        Ok(())
    }
}

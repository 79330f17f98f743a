//! WSDL service-description document generation.
//!
//! A pure function of the registry snapshot and the operation table: type
//! declarations mirroring every registered element and complexType, one
//! message pair and one operation entry per operation, replicated across
//! the SOAP, HTTP-GET and HTTP-POST binding styles. Callers cache the
//! result for the process lifetime.

use crate::primitives::PrimitiveType;
use crate::schema::{SchemaRegistry, TypeDef};
use crate::xml::XmlNode;
use tracing::warn;

const SOAP_WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
const TM_NS: &str = "http://microsoft.com/wsdl/mime/textMatching/";
const SOAPENC_NS: &str = "http://schemas.xmlsoap.org/soap/encoding/";
const MIME_NS: &str = "http://schemas.xmlsoap.org/wsdl/mime/";
const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";
const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
const SOAP12_WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";
const HTTP_WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/http/";
const SOAP_TRANSPORT: &str = "http://schemas.xmlsoap.org/soap/http";

/// Operation metadata consumed by the generator.
#[derive(Debug, Clone, Copy)]
pub struct OperationBinding<'a> {
    pub name: &'a str,
    pub info: &'a str,
    /// Input element name.
    pub input: &'a str,
    /// Output element name.
    pub output: &'a str,
}

/// Generate the complete WSDL document text.
pub fn generate(
    service_name: &str,
    service_url: &str,
    registry: &SchemaRegistry,
    operations: &[OperationBinding<'_>],
    pretty: bool,
) -> String {
    let mut definitions = XmlNode::new("wsdl:definitions");
    for (name, value) in [
        ("xmlns:soap", SOAP_WSDL_NS),
        ("xmlns:tm", TM_NS),
        ("xmlns:soapenc", SOAPENC_NS),
        ("xmlns:mime", MIME_NS),
        ("xmlns:wsdl", WSDL_NS),
        ("xmlns:s", XSD_NS),
        ("xmlns:soap12", SOAP12_WSDL_NS),
        ("xmlns:http", HTTP_WSDL_NS),
        ("xmlns:tns", service_url),
        ("targetNamespace", service_url),
    ] {
        definitions.set_attr(name, value);
    }

    definitions.children.push(types_section(registry, service_url));

    for op in operations {
        for message in messages_for(registry, op) {
            definitions.children.push(message);
        }
    }

    definitions
        .children
        .push(soap_port_type(service_name, operations));
    definitions
        .children
        .push(soap_binding(service_name, service_url, operations));
    definitions
        .children
        .push(http_port_type(service_name, "HttpPost", operations));
    definitions
        .children
        .push(http_binding(service_name, "HttpPost", "POST", operations));
    definitions
        .children
        .push(http_port_type(service_name, "HttpGet", operations));
    definitions
        .children
        .push(http_binding(service_name, "HttpGet", "GET", operations));
    definitions
        .children
        .push(service_section(service_name, service_url));

    let body = if pretty {
        definitions.to_pretty_xml()
    } else {
        definitions.to_xml()
    };
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}")
}

fn types_section(registry: &SchemaRegistry, service_url: &str) -> XmlNode {
    let mut schema = XmlNode::new("s:schema");
    schema.set_attr("elementFormDefault", "qualified");
    schema.set_attr("targetNamespace", service_url);

    for def in registry.elements() {
        let mut element = XmlNode::new("s:element");
        element.set_attr("name", &def.name);
        element.children.push(complex_type_node(def, false));
        schema.children.push(element);
    }
    for def in registry.complex_types() {
        schema.children.push(complex_type_node(def, true));
    }

    let mut types = XmlNode::new("wsdl:types");
    types.children.push(schema);
    types
}

fn complex_type_node(def: &TypeDef, named: bool) -> XmlNode {
    let mut complex_type = XmlNode::new("s:complexType");
    if named {
        complex_type.set_attr("name", &def.name);
    }
    if !def.sequence.is_empty() {
        let mut sequence = XmlNode::new("s:sequence");
        for (field_name, field) in &def.sequence {
            let mut element = XmlNode::new("s:element");
            element.set_attr("name", field_name);
            element.set_attr("type", prefixed_type(&field.type_name));
            element.set_attr("minOccurs", field.min_occurs.to_string());
            element.set_attr("maxOccurs", field.max_occurs.to_wire());
            sequence.children.push(element);
        }
        complex_type.children.push(sequence);
    }
    complex_type
}

fn prefixed_type(type_name: &str) -> String {
    if PrimitiveType::from_name(type_name).is_some() {
        format!("s:{type_name}")
    } else {
        format!("tns:{type_name}")
    }
}

fn messages_for(registry: &SchemaRegistry, op: &OperationBinding<'_>) -> Vec<XmlNode> {
    let mut out = Vec::new();

    // SOAP style references the input/output elements whole.
    out.push(element_message(
        &format!("Soap{}In", op.name),
        "parameters",
        op.input,
    ));
    out.push(element_message(
        &format!("Soap{}Out", op.name),
        "parameters",
        op.output,
    ));

    // The plain HTTP styles flatten the input element into primitive parts.
    for style in ["HttpGet", "HttpPost"] {
        let mut in_message = XmlNode::new("wsdl:message");
        in_message.set_attr("name", format!("{style}{}In", op.name));
        match registry.resolve(op.input) {
            Ok(def) => flatten_parts(registry, def, &mut in_message),
            Err(_) => warn!(operation = op.name, input = op.input, "input element not defined"),
        }
        out.push(in_message);
        out.push(element_message(
            &format!("{style}{}Out", op.name),
            "Body",
            op.output,
        ));
    }
    out
}

fn element_message(message_name: &str, part_name: &str, element: &str) -> XmlNode {
    let mut message = XmlNode::new("wsdl:message");
    message.set_attr("name", message_name);
    let mut part = XmlNode::new("wsdl:part");
    part.set_attr("name", part_name);
    part.set_attr("element", format!("tns:{element}"));
    message.children.push(part);
    message
}

/// Flatten a sequence into typed parts, descending into nested types so the
/// urlEncoded styles see only primitive leaves.
fn flatten_parts(registry: &SchemaRegistry, def: &TypeDef, message: &mut XmlNode) {
    for (field_name, field) in &def.sequence {
        if PrimitiveType::from_name(&field.type_name).is_some() {
            let mut part = XmlNode::new("wsdl:part");
            part.set_attr("name", field_name);
            part.set_attr("type", format!("s:{}", field.type_name));
            message.children.push(part);
        } else {
            match registry.resolve(&field.type_name) {
                Ok(nested) => flatten_parts(registry, nested, message),
                Err(_) => warn!(type_name = %field.type_name, "type not defined"),
            }
        }
    }
}

fn documented_operation(op: &OperationBinding<'_>, message_prefix: &str) -> XmlNode {
    let mut operation = XmlNode::new("wsdl:operation");
    operation.set_attr("name", op.name);

    let mut documentation = XmlNode::with_text("wsdl:documentation", op.info);
    documentation.set_attr("xmlns:wsdl", WSDL_NS);
    operation.children.push(documentation);

    let mut input = XmlNode::new("wsdl:input");
    input.set_attr("message", format!("tns:{message_prefix}{}In", op.name));
    operation.children.push(input);
    let mut output = XmlNode::new("wsdl:output");
    output.set_attr("message", format!("tns:{message_prefix}{}Out", op.name));
    operation.children.push(output);
    operation
}

fn soap_port_type(service_name: &str, operations: &[OperationBinding<'_>]) -> XmlNode {
    let mut port_type = XmlNode::new("wsdl:portType");
    port_type.set_attr("name", format!("{service_name}Soap"));
    for op in operations {
        port_type.children.push(documented_operation(op, "Soap"));
    }
    port_type
}

fn soap_binding(
    service_name: &str,
    service_url: &str,
    operations: &[OperationBinding<'_>],
) -> XmlNode {
    let mut binding = XmlNode::new("wsdl:binding");
    binding.set_attr("name", format!("{service_name}Soap"));
    binding.set_attr("type", format!("tns:{service_name}Soap"));

    let mut transport = XmlNode::new("soap:binding");
    transport.set_attr("transport", SOAP_TRANSPORT);
    binding.children.push(transport);

    for op in operations {
        let mut operation = XmlNode::new("wsdl:operation");
        operation.set_attr("name", op.name);

        let mut soap_operation = XmlNode::new("soap:operation");
        soap_operation.set_attr("style", "document");
        soap_operation.set_attr("soapAction", format!("{service_url}/{}/", op.name));
        operation.children.push(soap_operation);

        for direction in ["wsdl:input", "wsdl:output"] {
            let mut node = XmlNode::new(direction);
            let mut body = XmlNode::new("soap:body");
            body.set_attr("use", "literal");
            node.children.push(body);
            operation.children.push(node);
        }
        binding.children.push(operation);
    }
    binding
}

fn http_port_type(
    service_name: &str,
    style: &str,
    operations: &[OperationBinding<'_>],
) -> XmlNode {
    let mut port_type = XmlNode::new("wsdl:portType");
    port_type.set_attr("name", format!("{service_name}{style}"));
    for op in operations {
        port_type.children.push(documented_operation(op, style));
    }
    port_type
}

fn http_binding(
    service_name: &str,
    style: &str,
    verb: &str,
    operations: &[OperationBinding<'_>],
) -> XmlNode {
    let mut binding = XmlNode::new("wsdl:binding");
    binding.set_attr("name", format!("{service_name}{style}"));
    binding.set_attr("type", format!("tns:{service_name}{style}"));

    let mut http = XmlNode::new("http:binding");
    http.set_attr("verb", verb);
    binding.children.push(http);

    for op in operations {
        let mut operation = XmlNode::new("wsdl:operation");
        operation.set_attr("name", op.name);

        let mut location = XmlNode::new("http:operation");
        location.set_attr("location", format!("/{}/", op.name));
        operation.children.push(location);

        let mut input = XmlNode::new("wsdl:input");
        if verb == "GET" {
            input.children.push(XmlNode::new("http:urlEncoded"));
        } else {
            let mut content = XmlNode::new("mime:content");
            content.set_attr("type", "application/x-www-form-urlencoded");
            input.children.push(content);
        }
        operation.children.push(input);

        let mut output = XmlNode::new("wsdl:output");
        let mut mime = XmlNode::new("mime:mimeXml");
        mime.set_attr("part", "Body");
        output.children.push(mime);
        operation.children.push(output);

        binding.children.push(operation);
    }
    binding
}

fn service_section(service_name: &str, service_url: &str) -> XmlNode {
    let mut service = XmlNode::new("wsdl:service");
    service.set_attr("name", service_name);

    for (style, address) in [
        ("Soap", "soap:address"),
        ("HttpPost", "http:address"),
        ("HttpGet", "http:address"),
    ] {
        let mut port = XmlNode::new("wsdl:port");
        port.set_attr("name", format!("{service_name}{style}"));
        port.set_attr("binding", format!("tns:{service_name}{style}"));
        let mut location = XmlNode::new(address);
        location.set_attr("location", service_url);
        port.children.push(location);
        service.children.push(port);
    }
    service
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, Occurs, TypeDef};

    const URL: &str = "http://localhost:8080/test";

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register_complex_type(
                TypeDef::new("entryTp")
                    .field("id", FieldDef::new("integer"))
                    .field("label", FieldDef::new("string").max_length(32)),
            )
            .unwrap();
        registry
            .register_element(
                TypeDef::new("getListIn").field("filter", FieldDef::new("string").required()),
            )
            .unwrap();
        registry
            .register_element(
                TypeDef::new("getListOut")
                    .field("entry", FieldDef::new("entryTp").occurs(0, Occurs::Unbounded)),
            )
            .unwrap();
        registry
    }

    fn ops() -> Vec<OperationBinding<'static>> {
        vec![OperationBinding {
            name: "getList",
            info: "List callback",
            input: "getListIn",
            output: "getListOut",
        }]
    }

    #[test]
    fn test_type_declarations() {
        let wsdl = generate("testService", URL, &registry(), &ops(), false);
        assert!(wsdl.contains("<s:element name=\"getListIn\">"));
        assert!(wsdl.contains("<s:complexType name=\"entryTp\">"));
        assert!(wsdl.contains(
            "<s:element name=\"filter\" type=\"s:string\" minOccurs=\"1\" maxOccurs=\"1\"/>"
        ));
        assert!(wsdl.contains(
            "<s:element name=\"entry\" type=\"tns:entryTp\" minOccurs=\"0\" maxOccurs=\"unbounded\"/>"
        ));
        assert!(wsdl.contains("targetNamespace=\"http://localhost:8080/test\""));
    }

    #[test]
    fn test_message_pairs_per_style() {
        let wsdl = generate("testService", URL, &registry(), &ops(), false);
        for name in [
            "SoapgetListIn",
            "SoapgetListOut",
            "HttpGetgetListIn",
            "HttpGetgetListOut",
            "HttpPostgetListIn",
            "HttpPostgetListOut",
        ] {
            assert!(
                wsdl.contains(&format!("<wsdl:message name=\"{name}\"")),
                "missing message {name}"
            );
        }
        assert!(wsdl.contains("<wsdl:part name=\"parameters\" element=\"tns:getListIn\"/>"));
        assert!(wsdl.contains("<wsdl:part name=\"Body\" element=\"tns:getListOut\"/>"));
    }

    #[test]
    fn test_http_messages_flatten_primitive_leaves() {
        let mut registry = registry();
        registry
            .register_element(
                TypeDef::new("nestedIn").field("entry", FieldDef::new("entryTp")),
            )
            .unwrap();
        let ops = vec![OperationBinding {
            name: "nested",
            info: "",
            input: "nestedIn",
            output: "getListOut",
        }];
        let wsdl = generate("testService", URL, &registry, &ops, false);
        // entryTp's leaves appear as typed parts of the GET message.
        assert!(wsdl.contains("<wsdl:part name=\"id\" type=\"s:integer\"/>"));
        assert!(wsdl.contains("<wsdl:part name=\"label\" type=\"s:string\"/>"));
    }

    #[test]
    fn test_bindings_and_ports() {
        let wsdl = generate("testService", URL, &registry(), &ops(), false);
        assert!(wsdl.contains("<wsdl:portType name=\"testServiceSoap\">"));
        assert!(wsdl.contains("<wsdl:portType name=\"testServiceHttpGet\">"));
        assert!(wsdl.contains("<wsdl:portType name=\"testServiceHttpPost\">"));
        assert!(wsdl.contains(
            "<soap:operation style=\"document\" soapAction=\"http://localhost:8080/test/getList/\"/>"
        ));
        assert!(wsdl.contains("<http:binding verb=\"GET\"/>"));
        assert!(wsdl.contains("<http:binding verb=\"POST\"/>"));
        assert!(wsdl.contains("<mime:content type=\"application/x-www-form-urlencoded\"/>"));
        assert!(wsdl.contains("<wsdl:service name=\"testService\">"));
        assert!(wsdl.contains("<soap:address location=\"http://localhost:8080/test\"/>"));
        assert!(wsdl.contains("<wsdl:documentation xmlns:wsdl=\"http://schemas.xmlsoap.org/wsdl/\">List callback</wsdl:documentation>"));
    }

    #[test]
    fn test_pretty_output_starts_with_declaration() {
        let wsdl = generate("testService", URL, &registry(), &ops(), true);
        assert!(wsdl.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<wsdl:definitions"));
        assert!(wsdl.contains("\n  <wsdl:types>"));
    }
}

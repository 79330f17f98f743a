//! Error types and SOAP Fault framing.

use thiserror::Error;

/// Errors produced by the schema registry, the marshalling engine and the
/// dispatch boundary.
///
/// Decode and encode never panic and never recover from a child error: the
/// first error encountered anywhere in the recursion is returned as the
/// result and aborts further sibling processing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Requested type name is registered neither as element nor complexType.
    #[error("type \"{0}\" is not defined in the schema")]
    UnknownType(String),

    /// A required primitive leaf was absent from the wire document.
    #[error("required field \"{0}\" not specified")]
    RequiredFieldMissing(String),

    /// A wire value failed a primitive's format or range rule.
    #[error("value \"{raw}\" is not a valid {type_name}")]
    InvalidValue { type_name: String, raw: String },

    /// A string length facet was violated.
    #[error("{field}: {detail}")]
    ConstraintViolation { field: String, detail: String },

    /// A type was registered under a name that is already taken.
    #[error("type \"{0}\" is already registered")]
    DuplicateName(String),

    /// The request document lacks the expected envelope/body framing or the
    /// body does not carry the expected root element.
    #[error("invalid request envelope: {0}")]
    InvalidEnvelope(String),

    /// The wire bytes are not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(String),

    /// Dispatch target is not a registered operation.
    #[error("operation \"{0}\" is not defined")]
    UnknownOperation(String),

    /// Application logic failed while executing an operation.
    #[error("handler error: {0}")]
    Handler(String),
}

impl SchemaError {
    pub(crate) fn invalid_value(type_name: &str, raw: impl Into<String>) -> Self {
        Self::InvalidValue {
            type_name: type_name.to_string(),
            raw: raw.into(),
        }
    }
}

/// Fault code used when the caller supplies none.
pub const DEFAULT_FAULT_CODE: &str = "SOAP-ENV:-100";
/// Fault actor used when the caller supplies none.
pub const DEFAULT_FAULT_ACTOR: &str = "SOAP service";

/// Contents of a fault response document.
///
/// Wire field order is fixed: `faultcode`, `faultstring`, `faultactor`,
/// `detail`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fault {
    /// Machine-readable code; defaults to [`DEFAULT_FAULT_CODE`].
    pub code: Option<String>,
    /// Human-readable message.
    pub string: Option<String>,
    /// Originating service label; defaults to [`DEFAULT_FAULT_ACTOR`].
    pub actor: Option<String>,
    /// Free-form diagnostic payload.
    pub detail: Option<String>,
}

impl Fault {
    /// Fault carrying only a message; code and actor take their defaults.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            string: Some(message.into()),
            ..Default::default()
        }
    }
}

impl From<&SchemaError> for Fault {
    fn from(err: &SchemaError) -> Self {
        Fault::from_message(err.to_string())
    }
}

/// Render a fault wire document.
///
/// `bare` selects the unwrapped `<Fault>` form used by the plain HTTP wire
/// styles; otherwise the fault is framed in a SOAP envelope.
pub fn fault_response(fault: &Fault, bare: bool) -> String {
    let body = format!(
        "<faultcode type=\"xsd:string\">{}</faultcode>\
         <faultstring type=\"xsd:string\">{}</faultstring>\
         <faultactor type=\"xsd:string\">{}</faultactor>\
         <detail type=\"xsd:string\">{}</detail>",
        xml_escape(fault.code.as_deref().unwrap_or(DEFAULT_FAULT_CODE)),
        xml_escape(fault.string.as_deref().unwrap_or("")),
        xml_escape(fault.actor.as_deref().unwrap_or(DEFAULT_FAULT_ACTOR)),
        xml_escape(fault.detail.as_deref().unwrap_or("")),
    );

    if bare {
        format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Fault>{body}</Fault>")
    } else {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <SOAP-ENV:Envelope \
             xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\" \
             xmlns:SOAP-ENC=\"http://schemas.xmlsoap.org/soap/encoding/\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" \
             SOAP-ENV:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">\
             <SOAP-ENV:Body><SOAP-ENV:Fault>{body}</SOAP-ENV:Fault></SOAP-ENV:Body>\
             </SOAP-ENV:Envelope>"
        )
    }
}

pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_defaults() {
        let fault = Fault::from_message("boom");
        let xml = fault_response(&fault, false);
        assert!(xml.contains("<faultcode type=\"xsd:string\">SOAP-ENV:-100</faultcode>"));
        assert!(xml.contains("<faultstring type=\"xsd:string\">boom</faultstring>"));
        assert!(xml.contains("<faultactor type=\"xsd:string\">SOAP service</faultactor>"));
        assert!(xml.contains("<detail type=\"xsd:string\"></detail>"));
        assert!(xml.contains("SOAP-ENV:Envelope"));
    }

    #[test]
    fn test_fault_bare_form() {
        let fault = Fault {
            code: Some("Server".to_string()),
            string: Some("internal".to_string()),
            actor: None,
            detail: Some("stack".to_string()),
        };
        let xml = fault_response(&fault, true);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<Fault>"));
        assert!(!xml.contains("Envelope"));
        assert!(xml.contains("<faultcode type=\"xsd:string\">Server</faultcode>"));
        assert!(xml.contains("<detail type=\"xsd:string\">stack</detail>"));
    }

    #[test]
    fn test_fault_field_order_is_fixed() {
        let xml = fault_response(&Fault::from_message("x"), true);
        let code = xml.find("<faultcode").unwrap();
        let string = xml.find("<faultstring").unwrap();
        let actor = xml.find("<faultactor").unwrap();
        let detail = xml.find("<detail").unwrap();
        assert!(code < string && string < actor && actor < detail);
    }

    #[test]
    fn test_fault_message_is_escaped() {
        let fault = Fault::from_message("a < b & \"c\"");
        let xml = fault_response(&fault, true);
        assert!(xml.contains("a &lt; b &amp; &quot;c&quot;"));
    }

    #[test]
    fn test_fault_from_error() {
        let err = SchemaError::UnknownType("Point".to_string());
        let fault = Fault::from(&err);
        assert_eq!(
            fault.string.as_deref(),
            Some("type \"Point\" is not defined in the schema")
        );
        assert!(fault.code.is_none());
    }

    #[test]
    fn test_error_display() {
        let err = SchemaError::InvalidValue {
            type_name: "byte".to_string(),
            raw: "200".to_string(),
        };
        assert_eq!(err.to_string(), "value \"200\" is not a valid byte");
    }
}

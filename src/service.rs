//! Service assembly and wire-style dispatch.
//!
//! A [`WsdlService`] is populated during a single-threaded setup phase
//! (`complex_type` / `element` / `operation`) and is read-only afterwards;
//! share it behind an `Arc` and dispatch concurrently without locking.

use crate::codec::SchemaCodec;
use crate::config::ServiceConfig;
use crate::error::{fault_response, Fault, SchemaError};
use crate::schema::{SchemaRegistry, TypeDef};
use crate::value::Value;
use crate::wsdl::{self, OperationBinding};
use indexmap::IndexMap;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";
const CONTENT_TYPE_XML: &str = "text/xml; charset=utf-8";

/// Error raised by application logic during operation execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError(pub String);

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        Self(msg.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}

/// Application logic bound to an operation. Receives the decoded request
/// tree and returns the response tree to encode.
pub type Handler = Box<dyn Fn(&Value) -> Result<Value, HandlerError> + Send + Sync>;

/// Declaration of one remote operation.
pub struct OperationDef {
    pub name: String,
    pub info: String,
    /// Input element name; an empty element is auto-declared when omitted.
    pub input: Option<String>,
    /// Output element name; an empty element is auto-declared when omitted.
    pub output: Option<String>,
    pub handler: Handler,
}

impl OperationDef {
    pub fn new<F>(name: impl Into<String>, info: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            info: info.into(),
            input: None,
            output: None,
            handler: Box::new(handler),
        }
    }

    pub fn input(mut self, element: impl Into<String>) -> Self {
        self.input = Some(element.into());
        self
    }

    pub fn output(mut self, element: impl Into<String>) -> Self {
        self.output = Some(element.into());
        self
    }
}

struct Operation {
    info: String,
    input: String,
    output: String,
    handler: Handler,
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("info", &self.info)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("handler", &"<handler>")
            .finish()
    }
}

/// A transport-agnostic request, as classified by the HTTP shell.
pub enum WireRequest<'a> {
    /// `?wsdl`: the service description document.
    Wsdl,
    /// SOAP POST carrying a SOAPAction header and an envelope body.
    Soap { action: &'a str, body: &'a str },
    /// Plain HTTP-GET/POST style: operation name plus string parameters.
    Params {
        operation: &'a str,
        params: &'a [(String, String)],
    },
}

pub struct WireResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

/// A SOAP service: schema registry, operation table and dispatch.
#[derive(Debug)]
pub struct WsdlService {
    config: ServiceConfig,
    registry: SchemaRegistry,
    operations: IndexMap<String, Operation>,
    wsdl_cache: OnceLock<String>,
}

impl WsdlService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            registry: SchemaRegistry::new(),
            operations: IndexMap::new(),
            wsdl_cache: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Declare a complexType, usable only as a nested field type.
    pub fn complex_type(&mut self, def: TypeDef) -> Result<&mut Self, SchemaError> {
        self.registry.register_complex_type(def)?;
        Ok(self)
    }

    /// Declare an element, additionally usable as an operation input/output.
    pub fn element(&mut self, def: TypeDef) -> Result<&mut Self, SchemaError> {
        self.registry.register_element(def)?;
        Ok(self)
    }

    /// Declare an operation. Omitted input/output declares empty
    /// `<name>NullRequest` / `<name>NullResponse` elements; named ones must
    /// already be registered as elements.
    pub fn operation(&mut self, def: OperationDef) -> Result<&mut Self, SchemaError> {
        if self.operations.contains_key(&def.name) {
            return Err(SchemaError::DuplicateName(def.name));
        }
        let input = match def.input {
            Some(name) => {
                self.registry.resolve_element(&name)?;
                name
            }
            None => {
                let name = format!("{}NullRequest", def.name);
                self.registry.register_element(TypeDef::new(&name))?;
                name
            }
        };
        let output = match def.output {
            Some(name) => {
                self.registry.resolve_element(&name)?;
                name
            }
            None => {
                let name = format!("{}NullResponse", def.name);
                self.registry.register_element(TypeDef::new(&name))?;
                name
            }
        };
        self.operations.insert(
            def.name,
            Operation {
                info: def.info,
                input,
                output,
                handler: def.handler,
            },
        );
        Ok(self)
    }

    fn codec(&self) -> SchemaCodec<'_> {
        SchemaCodec::new(&self.registry, &self.config.url)
    }

    /// The WSDL document, generated from the registry snapshot on first use
    /// and cached for the process lifetime.
    pub fn wsdl(&self) -> &str {
        self.wsdl_cache.get_or_init(|| {
            let bindings: Vec<OperationBinding<'_>> = self
                .operations
                .iter()
                .map(|(name, op)| OperationBinding {
                    name,
                    info: &op.info,
                    input: &op.input,
                    output: &op.output,
                })
                .collect();
            wsdl::generate(
                &self.config.name,
                &self.config.url,
                &self.registry,
                &bindings,
                self.config.pretty_wsdl,
            )
        })
    }

    /// Execute a SOAP request: decode the body against the operation's
    /// input element, run the handler, encode the result in an envelope.
    pub fn invoke_soap(&self, action_header: &str, body: &str) -> Result<String, SchemaError> {
        let action = soap_action_operation(action_header);
        let op = self
            .operations
            .get(action)
            .ok_or_else(|| SchemaError::UnknownOperation(action.to_string()))?;
        debug!(operation = action, "dispatching SOAP request");

        let request = self.codec().decode(body, &op.input)?;
        let response = (op.handler)(&request).map_err(|e| SchemaError::Handler(e.0))?;
        let doc = self.codec().encode(Some(&response), &op.output)?;
        Ok(format!("{XML_DECL}{}", doc.to_xml()))
    }

    /// Execute a plain HTTP-style request. Parameters reach the handler as
    /// text values without schema decoding; the response is encoded without
    /// envelope framing.
    pub fn invoke_params(
        &self,
        operation: &str,
        params: &[(String, String)],
    ) -> Result<String, SchemaError> {
        let op = self
            .operations
            .get(operation)
            .ok_or_else(|| SchemaError::UnknownOperation(operation.to_string()))?;
        debug!(operation, "dispatching parameter request");

        let request = Value::Struct(
            params
                .iter()
                .map(|(k, v)| (k.clone(), Value::Text(v.clone())))
                .collect(),
        );
        let response = (op.handler)(&request).map_err(|e| SchemaError::Handler(e.0))?;
        let doc = self.codec().encode_bare(Some(&response), &op.output)?;
        Ok(format!("{XML_DECL}{}", doc.to_xml()))
    }

    /// Total dispatch: every failure is framed as a fault document scoped
    /// to the request; nothing here is fatal to the process.
    pub fn handle(&self, request: WireRequest<'_>) -> WireResponse {
        match request {
            WireRequest::Wsdl => WireResponse {
                status: 200,
                content_type: CONTENT_TYPE_XML,
                body: self.wsdl().to_string(),
            },
            WireRequest::Soap { action, body } => match self.invoke_soap(action, body) {
                Ok(body) => WireResponse {
                    status: 200,
                    content_type: CONTENT_TYPE_XML,
                    body,
                },
                Err(err) => {
                    warn!(error = %err, "SOAP request failed");
                    fault_with_status(&err, false)
                }
            },
            WireRequest::Params { operation, params } => {
                match self.invoke_params(operation, params) {
                    Ok(body) => WireResponse {
                        status: 200,
                        content_type: CONTENT_TYPE_XML,
                        body,
                    },
                    Err(err) => {
                        warn!(error = %err, "parameter request failed");
                        fault_with_status(&err, true)
                    }
                }
            }
        }
    }
}

fn fault_with_status(err: &SchemaError, bare: bool) -> WireResponse {
    WireResponse {
        status: 500,
        content_type: CONTENT_TYPE_XML,
        body: fault_response(&Fault::from(err), bare),
    }
}

/// Operation name carried by a SOAPAction header: surrounding quotes and a
/// trailing slash are stripped, then the last path segment is taken.
pub fn soap_action_operation(header: &str) -> &str {
    let trimmed = header.trim().trim_matches('"').trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;

    fn echo_service() -> WsdlService {
        let mut service = WsdlService::new(ServiceConfig {
            name: "testService".to_string(),
            url: "http://localhost:8080/test".to_string(),
            pretty_wsdl: false,
        });
        service
            .element(TypeDef::new("echoIn").field("message", FieldDef::new("string").required()))
            .unwrap()
            .element(TypeDef::new("echoOut").field("message", FieldDef::new("string")))
            .unwrap()
            .operation(
                OperationDef::new("echo", "Echo callback", |req: &Value| {
                    Ok(Value::record([(
                        "message",
                        req.get("message").cloned().unwrap_or(Value::Null),
                    )]))
                })
                .input("echoIn")
                .output("echoOut"),
            )
            .unwrap();
        service
    }

    #[test]
    fn test_soap_action_operation() {
        assert_eq!(
            soap_action_operation("\"http://localhost:8080/test/echo/\""),
            "echo"
        );
        assert_eq!(soap_action_operation("http://x/y/getList/"), "getList");
        assert_eq!(soap_action_operation("\"echo\""), "echo");
        assert_eq!(soap_action_operation("  echo  "), "echo");
    }

    #[test]
    fn test_invoke_soap_round_trip() {
        let service = echo_service();
        let body = "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\
                    <soap:Body><echoIn><message>hi there</message></echoIn></soap:Body>\
                    </soap:Envelope>";
        let response = service.invoke_soap("\"http://localhost:8080/test/echo/\"", body).unwrap();
        assert!(response.starts_with(XML_DECL));
        assert!(response.contains("<echoOut xmlns=\"http://localhost:8080/test\">"));
        assert!(response.contains("<message>hi there</message>"));
        assert!(response.contains("soap:Envelope"));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let service = echo_service();
        assert_eq!(
            service.invoke_soap("nope", "<x/>").unwrap_err(),
            SchemaError::UnknownOperation("nope".to_string())
        );
    }

    #[test]
    fn test_invoke_params_passes_text_through() {
        let service = echo_service();
        let params = vec![("message".to_string(), "from query".to_string())];
        let response = service.invoke_params("echo", &params).unwrap();
        assert!(response.contains("<message>from query</message>"));
        assert!(!response.contains("Envelope"));
    }

    #[test]
    fn test_auto_declared_null_elements() {
        let mut service = WsdlService::new(ServiceConfig::default());
        service
            .operation(OperationDef::new("ping", "liveness", |_req: &Value| {
                Ok(Value::record::<&str, _>([]))
            }))
            .unwrap();
        assert!(service.registry().resolve_element("pingNullRequest").is_ok());
        assert!(service.registry().resolve_element("pingNullResponse").is_ok());
        assert!(service.wsdl().contains("pingNullRequest"));
    }

    #[test]
    fn test_operation_requires_known_elements() {
        let mut service = WsdlService::new(ServiceConfig::default());
        let err = service
            .operation(
                OperationDef::new("bad", "", |_req: &Value| Ok(Value::Null)).input("missingIn"),
            )
            .unwrap_err();
        assert_eq!(err, SchemaError::UnknownType("missingIn".to_string()));
    }

    #[test]
    fn test_duplicate_operation_rejected() {
        let mut service = WsdlService::new(ServiceConfig::default());
        service
            .operation(OperationDef::new("ping", "", |_req: &Value| Ok(Value::Null)))
            .unwrap();
        let err = service
            .operation(OperationDef::new("ping", "", |_req: &Value| Ok(Value::Null)))
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateName("ping".to_string()));
    }

    #[test]
    fn test_handler_error_becomes_fault() {
        let mut service = WsdlService::new(ServiceConfig::default());
        service
            .operation(OperationDef::new("explode", "always fails", |_req: &Value| {
                Err(HandlerError::from("Oops! It's an error!"))
            }))
            .unwrap();
        let response = service.handle(WireRequest::Params {
            operation: "explode",
            params: &[],
        });
        assert_eq!(response.status, 500);
        assert!(response.body.contains("<Fault>"));
        assert!(response.body.contains("handler error: Oops! It&apos;s an error!"));
    }

    #[test]
    fn test_handle_wsdl() {
        let service = echo_service();
        let response = service.handle(WireRequest::Wsdl);
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "text/xml; charset=utf-8");
        assert!(response.body.contains("<wsdl:definitions"));
        assert!(response.body.contains("testServiceSoap"));
    }

    #[test]
    fn test_soap_fault_is_envelope_wrapped() {
        let service = echo_service();
        let response = service.handle(WireRequest::Soap {
            action: "echo",
            body: "<not-an-envelope/>",
        });
        assert_eq!(response.status, 500);
        assert!(response.body.contains("SOAP-ENV:Fault"));
        assert!(response.body.contains("invalid request envelope"));
    }
}

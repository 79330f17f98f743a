//! Schema-driven SOAP/WSDL service toolkit.
//!
//! Exposes remote operations described by an XML Schema style type system
//! over a SOAP/HTTP surface. The core is a bidirectional marshalling
//! engine: a declarative registry of named types drives both the decoding
//! of inbound wire documents into native value trees and the encoding of
//! value trees back into wire documents, enforcing cardinality, nullability
//! and per-primitive format and range rules. The same registry feeds a
//! WSDL generator covering the SOAP, HTTP-GET and HTTP-POST binding
//! styles.
//!
//! # Example
//!
//! ```ignore
//! use wsdl_service::{
//!     FieldDef, OperationDef, ServiceConfig, TypeDef, Value, WsdlService,
//! };
//!
//! let mut service = WsdlService::new(ServiceConfig::default());
//! service
//!     .element(TypeDef::new("getStartTimeIn")
//!         .field("startTime", FieldDef::new("dateTime")))?
//!     .element(TypeDef::new("getStartTimeOut")
//!         .field("startTime", FieldDef::new("dateTime")))?
//!     .operation(
//!         OperationDef::new("getStartTime", "Datetime callback", |req| {
//!             Ok(Value::record([(
//!                 "startTime",
//!                 req.get("startTime").cloned().unwrap_or(Value::Null),
//!             )]))
//!         })
//!         .input("getStartTimeIn")
//!         .output("getStartTimeOut"),
//!     )?;
//!
//! let response = service.invoke_soap(action_header, request_body)?;
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod primitives;
pub mod schema;
pub mod service;
pub mod value;
pub mod wsdl;
pub mod xml;

pub use codec::SchemaCodec;
pub use config::ServiceConfig;
pub use error::{fault_response, Fault, SchemaError};
pub use schema::{FieldDef, Occurs, SchemaRegistry, TypeDef};
pub use service::{
    HandlerError, OperationDef, WireRequest, WireResponse, WsdlService,
};
pub use value::Value;

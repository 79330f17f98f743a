//! Demo SOAP service binary.
//!
//! Run with: `wsdl-service --config config.yaml --listen 127.0.0.1:8080`
//!
//! Serves a small example service over HTTP: `?wsdl` returns the service
//! description, POST with a SOAPAction header dispatches SOAP requests, and
//! plain GET/POST invoke operations with url-encoded parameters.

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use wsdl_service::{
    FieldDef, Occurs, OperationDef, ServiceConfig, TypeDef, Value, WireRequest, WsdlService,
};

/// Demo SOAP/WSDL service.
///
/// Exposes a schema-described example service over SOAP, HTTP-GET and
/// HTTP-POST wire styles, with the WSDL document served at `?wsdl`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting wsdl-service v{}", env!("CARGO_PKG_VERSION"));

    let config = if args.config.exists() {
        let content = tokio::fs::read_to_string(&args.config)
            .await
            .context("Failed to read config file")?;
        serde_yaml::from_str(&content).context("Failed to parse config file")?
    } else {
        info!("Config file not found, using defaults");
        ServiceConfig::default()
    };

    info!(name = %config.name, url = %config.url, "Configuration loaded");

    let service = Arc::new(demo_service(config)?);
    info!("Service initialized");

    let app = Router::new().fallback(dispatch).with_state(service);
    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!("Listening on http://{}", args.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Service stopped");
    Ok(())
}

/// Example service definition: a datetime echo, a list-valued answer and an
/// operation that always faults.
fn demo_service(config: ServiceConfig) -> Result<WsdlService> {
    let mut service = WsdlService::new(config);

    service
        .element(TypeDef::new("getStartTimeIn").field("startTime", FieldDef::new("dateTime")))?
        .element(TypeDef::new("getStartTimeOut").field("startTime", FieldDef::new("dateTime")))?
        .operation(
            OperationDef::new("getStartTime", "Datetime callback", |req: &Value| {
                Ok(Value::record([(
                    "startTime",
                    req.get("startTime").cloned().unwrap_or(Value::Null),
                )]))
            })
            .input("getStartTimeIn")
            .output("getStartTimeOut"),
        )?;

    service
        .complex_type(
            TypeDef::new("scheduleEntryTp")
                .field("idSchedule", FieldDef::new("integer"))
                .field("idPoint", FieldDef::new("integer"))
                .field("nameSchedule", FieldDef::new("string"))
                .field("time", FieldDef::new("string")),
        )?
        .element(
            TypeDef::new("scheduleListTp").field(
                "scheduleEntry",
                FieldDef::new("scheduleEntryTp").occurs(0, Occurs::Unbounded),
            ),
        )?
        .operation(
            OperationDef::new("getList", "List callback", |_req: &Value| {
                let entry = |id: i64, name: &str, time: &str| {
                    Value::record([
                        ("idSchedule", Value::from(id)),
                        ("idPoint", Value::from(id + 100)),
                        ("nameSchedule", Value::from(name)),
                        ("time", Value::from(time)),
                    ])
                };
                Ok(Value::record([(
                    "scheduleEntry",
                    Value::List(vec![
                        entry(100, "test1", "10:10:15"),
                        entry(101, "test2", "10:10:16"),
                        entry(102, "test3", "10:10:18"),
                    ]),
                )]))
            })
            .output("scheduleListTp"),
        )?;

    service.operation(OperationDef::new(
        "getError",
        "Error callback",
        |_req: &Value| Err("Oops! It's an error!".into()),
    ))?;

    Ok(service)
}

async fn dispatch(
    State(service): State<Arc<WsdlService>>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let wire = if query.iter().any(|(k, _)| k == "wsdl") {
        service.handle(WireRequest::Wsdl)
    } else {
        let operation = last_path_segment(uri.path());
        if method == Method::GET {
            service.handle(WireRequest::Params {
                operation,
                params: &query,
            })
        } else if method == Method::POST {
            let soap_action = headers
                .get("soapaction")
                .and_then(|value| value.to_str().ok());
            match soap_action {
                Some(action) => service.handle(WireRequest::Soap {
                    action,
                    body: &body,
                }),
                None => {
                    let params: Vec<(String, String)> =
                        serde_urlencoded::from_str(&body).unwrap_or_default();
                    service.handle(WireRequest::Params {
                        operation,
                        params: &params,
                    })
                }
            }
        } else {
            service.handle(WireRequest::Params {
                operation: "",
                params: &[],
            })
        }
    };

    let status = StatusCode::from_u16(wire.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(CONTENT_TYPE, wire.content_type)], wire.body)
}

fn last_path_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

use std::env;
use std::time::Duration;

use opentelemetry::global;
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use opentelemetry::KeyValue;
use opentelemetry_http::HeaderExtractor;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::trace::{self, Sampler, TracerProvider};
use opentelemetry_sdk::Resource;
use opentelemetry_stdout::SpanExporter;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::SERVICE_NAME;

pub struct TracerGuard;

impl Drop for TracerGuard {
    fn drop(&mut self) {
        tracing::info!("shutting down tracer");
        global::shutdown_tracer_provider();
    }
}

/// Exporter selection, read from the standard OTEL_* variables.
#[derive(Debug, Clone, PartialEq)]
pub enum Exporter {
    None,
    Stdout,
    Otlp { endpoint: String, sampling_rate: f64 },
}

impl Exporter {
    pub fn from_env() -> Self {
        let sampling_rate = env::var("OTEL_SAMPLING_RATE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1.0);
        Self::from_endpoint(env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(), sampling_rate)
    }

    fn from_endpoint(endpoint: Option<String>, sampling_rate: f64) -> Self {
        match endpoint.as_deref() {
            Some("") | None => Exporter::None,
            Some("stdout") => Exporter::Stdout,
            Some(endpoint) => Exporter::Otlp {
                endpoint: endpoint.to_string(),
                sampling_rate,
            },
        }
    }
}

pub fn init_tracer() -> anyhow::Result<(TracerProvider, String)> {
    let service_name = env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| SERVICE_NAME.to_string());
    global::set_text_map_propagator(TraceContextPropagator::new());

    let (tracer_provider, info) = match Exporter::from_env() {
        Exporter::None => (
            TracerProvider::builder()
                .with_config(trace::Config::default())
                .build(),
            "No OTLP endpoint".to_owned(),
        ),
        Exporter::Stdout => (
            TracerProvider::builder()
                .with_simple_exporter(SpanExporter::default())
                .build(),
            "OTLP stdout exporter".to_owned(),
        ),
        Exporter::Otlp {
            endpoint,
            sampling_rate,
        } => {
            let exporter = opentelemetry_otlp::new_exporter()
                .http()
                .with_endpoint(&endpoint)
                .with_timeout(Duration::from_secs(5));
            let provider = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(exporter)
                .with_trace_config(
                    trace::Config::default()
                        .with_sampler(Sampler::TraceIdRatioBased(sampling_rate))
                        .with_resource(Resource::new(vec![KeyValue::new(
                            "service.name",
                            service_name,
                        )])),
                )
                .install_batch(runtime::Tokio)?;
            (provider, format!("OTLP endpoint: {}", endpoint))
        }
    };

    global::set_tracer_provider(tracer_provider.clone());
    Ok((tracer_provider, info))
}

/// Root span of one HTTP request, joined to the caller's trace when a
/// `traceparent` header is present.
pub fn make_span<B>(request: &http::Request<B>) -> tracing::Span {
    let cx = extract_context(request.headers());
    let trace_id = cx.span().span_context().trace_id().to_string();
    let res = tracing::info_span!(
        "request",
        otel.kind = "server",
        method = %request.method(),
        uri = %request.uri(),
        trace_id,
    );
    res.set_parent(cx);
    res
}

fn extract_context(headers: &http::HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

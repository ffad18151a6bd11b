//! Optional OpenTelemetry export
//!
//! Enabled by building with `--features telemetry` and setting
//! `OTEL_EXPORTER_OTLP_ENDPOINT` (e.g. `http://localhost:4317`).
//! `OTEL_SERVICE_NAME` overrides the reported service name.

use anyhow::Result;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

const ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// What happened to OpenTelemetry, reported once logging is up
pub enum TelemetryStatus {
    NotConfigured,
    Enabled { endpoint: String },
    FeatureDisabled,
}

pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Build the OTLP tracing layer if an endpoint is configured
pub fn layer<S>() -> Result<(Option<BoxedLayer<S>>, TelemetryStatus)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let Ok(endpoint) = std::env::var(ENDPOINT_VAR) else {
        return Ok((None, TelemetryStatus::NotConfigured));
    };

    #[cfg(feature = "telemetry")]
    {
        let layer = otlp_layer(&endpoint)?;
        Ok((Some(layer), TelemetryStatus::Enabled { endpoint }))
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = endpoint;
        Ok((None, TelemetryStatus::FeatureDisabled))
    }
}

#[cfg(feature = "telemetry")]
fn otlp_layer<S>(endpoint: &str) -> Result<BoxedLayer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "waitline-daemon".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name,
        )]))
        .build();
    let tracer = provider.tracer("waitline");
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}

/// Flush pending spans on shutdown
pub fn shutdown() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}

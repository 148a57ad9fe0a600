use crate::config::OtelConfig;
use crate::error::{IndexerError, IndexerResult};
use crate::metrics::MILLISECONDS_BOUNDARIES;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::reader::{DefaultAggregationSelector, DefaultTemporalitySelector};
use opentelemetry_sdk::metrics::{new_view, Aggregation, Instrument, PeriodicReader, SdkMeterProvider, Stream};
use opentelemetry_sdk::trace::{BatchConfigBuilder, Tracer};
use opentelemetry_sdk::{runtime, Resource};
use std::time::Duration;
use tracing::warn;
use url::Url;

const METRIC_EXPORT_INTERVAL: Duration = Duration::from_secs(5);

/// OTLP instrumentation for the daemon. When no endpoint is configured
/// everything stays a no-op: instruments accept measurements without a
/// provider and never block or fail the operation being measured.
pub struct Instrumentation {
    meter_provider: Option<SdkMeterProvider>,
}

impl Instrumentation {
    /// Install metric and trace providers. Returns the tracer to compose
    /// into the logging subscriber, when instrumentation is enabled.
    pub fn new(config: &OtelConfig) -> IndexerResult<(Self, Option<Tracer>)> {
        match &config.endpoint {
            None => {
                warn!("otel endpoint is not set, skipping instrumentation");
                Ok((Self { meter_provider: None }, None))
            }
            Some(endpoint) => {
                let meter_provider = init_metrics(endpoint, &config.service_name)?;
                global::set_meter_provider(meter_provider.clone());
                let tracer = init_tracer(endpoint, &config.service_name)?;
                Ok((Self { meter_provider: Some(meter_provider) }, Some(tracer)))
            }
        }
    }

    pub fn shutdown(&self) -> IndexerResult<()> {
        global::shutdown_tracer_provider();
        match &self.meter_provider {
            Some(provider) => provider
                .shutdown()
                .map_err(|err| IndexerError::InstrumentationError(err.to_string())),
            None => Ok(()),
        }
    }
}

fn service_resource(service_name: &str, suffix: &str) -> Resource {
    Resource::new(vec![KeyValue::new(
        opentelemetry_semantic_conventions::resource::SERVICE_NAME,
        format!("{service_name}{suffix}"),
    )])
}

fn init_metrics(endpoint: &Url, service_name: &str) -> IndexerResult<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint.to_string())
        .build_metrics_exporter(
            Box::new(DefaultAggregationSelector::new()),
            Box::new(DefaultTemporalitySelector::new()),
        )
        .map_err(|err| IndexerError::InstrumentationError(err.to_string()))?;

    let reader = PeriodicReader::builder(exporter, runtime::Tokio)
        .with_interval(METRIC_EXPORT_INTERVAL)
        .build();

    // Duration histograms share one fixed bucket layout, installed here so
    // individual instruments stay declaration-only.
    let duration_view = new_view(
        Instrument::new().name("*_duration_ms"),
        Stream::new().aggregation(Aggregation::ExplicitBucketHistogram {
            boundaries: MILLISECONDS_BOUNDARIES.to_vec(),
            record_min_max: true,
        }),
    )
    .map_err(|err| IndexerError::InstrumentationError(err.to_string()))?;

    Ok(SdkMeterProvider::builder()
        .with_reader(reader)
        .with_view(duration_view)
        .with_resource(service_resource(service_name, "_meter_service"))
        .build())
}

fn init_tracer(endpoint: &Url, service_name: &str) -> IndexerResult<Tracer> {
    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint.to_string()))
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default()
                .with_resource(service_resource(service_name, "_trace_service")),
        )
        .with_batch_config(BatchConfigBuilder::default().build())
        .install_batch(runtime::Tokio)
        .map_err(|err| IndexerError::InstrumentationError(err.to_string()))?;

    global::set_tracer_provider(provider.clone());
    Ok(provider.tracer(format!("{service_name}_subscriber")))
}

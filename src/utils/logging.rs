use opentelemetry_sdk::trace::Tracer;
use tracing::Level;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Initialize the global tracing subscriber.
///
/// Reads `RUST_LOG` for filtering and `LOG_FORMAT` ("json" or "pretty")
/// for output. When instrumentation produced a tracer, its span-export
/// layer is composed into the same subscriber.
///
/// Also installs color_eyre to handle panics in the application.
pub fn init_logging(tracer: Option<Tracer>) {
    color_eyre::install().expect("unable to install color_eyre");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(Level::INFO.into())
            .parse_lossy("indexer=info")
    });

    let otel_layer = tracer.map(OpenTelemetryLayer::new);
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        let subscriber = Registry::default()
            .with(env_filter)
            .with(otel_layer)
            .with(fmt::layer().json().with_file(true).with_line_number(true));
        tracing::subscriber::set_global_default(subscriber)
            .expect("failed to set global default subscriber");
    } else {
        let subscriber = Registry::default()
            .with(env_filter)
            .with(otel_layer)
            .with(fmt::layer().with_target(true).with_file(true).with_line_number(true));
        tracing::subscriber::set_global_default(subscriber)
            .expect("failed to set global default subscriber");
    }
}

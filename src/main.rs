use std::path::PathBuf;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use video_process_rs::{
    api::{self, AppState},
    config::Config,
    ffmpeg::FFMpegWrapper,
    otel,
    service::Service,
    SERVICE_NAME,
};

#[derive(Parser, Debug)]
#[command(version = env!("CARGO_APP_VERSION"), name = SERVICE_NAME, about="Service for video cropping, scaling and MP4 conversion",
    long_about = None)]
struct Args {
    /// HTTP server port
    #[arg(long, env, default_value = "3000")]
    port: u16,
    /// Directory for uploaded and transcoded files (OS temp dir by default)
    #[arg(long, env)]
    temp_dir: Option<PathBuf>,
    /// ffmpeg binary
    #[arg(long, env, default_value = "ffmpeg")]
    ffmpeg: String,
    /// Max upload size in MiB
    #[arg(long, env, default_value = "500")]
    max_upload_mb: usize,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let _guard = otel::TracerGuard;

    use opentelemetry::trace::TracerProvider as _;

    let (provider, tr_info) = otel::init_tracer()?;
    let tracer = provider.tracer(SERVICE_NAME);
    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::Layer::default().compact())
        .with(telemetry)
        .init();
    tracing::info!(info = tr_info, "tracer");
    let args = Args::parse();
    if let Err(e) = main_int(args).await {
        tracing::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn main_int(args: Args) -> anyhow::Result<()> {
    tracing::info!(name = SERVICE_NAME, "Starting HTTP service");
    tracing::info!(version = env!("CARGO_APP_VERSION"));
    let config = Config::new(args.port, args.temp_dir, args.ffmpeg, args.max_upload_mb);
    tracing::info!(port = config.port);
    tracing::info!(temp_dir = %config.temp_dir.display());
    tracing::info!(max_upload_bytes = config.max_upload_bytes);

    let cancel_token = CancellationToken::new();

    let ct = cancel_token.clone();
    let mut int_stream = signal(SignalKind::interrupt())?;
    let mut term_stream = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = int_stream.recv() => tracing::info!("Exit event int"),
            _ = term_stream.recv() => tracing::info!("Exit event term"),
        }
        tracing::debug!("sending exit event");
        ct.cancel();
    });

    let ffmpeg_wrapper = FFMpegWrapper::new(config.ffmpeg.clone());
    match ffmpeg_wrapper.check().await {
        Ok(version) => tracing::info!(version, "ffmpeg found"),
        Err(e) => tracing::warn!(error = %e, "ffmpeg not available, requests will fail"),
    }

    let address: std::net::SocketAddr = format!("[::]:{}", config.port).parse()?;
    tracing::info!(address = format!("{:?}", address), "address");

    let service = Service::new(ffmpeg_wrapper, config.temp_dir.clone());
    let app = api::create_app(AppState::new(service, config));
    let listener = tokio::net::TcpListener::bind(address).await?;

    let ct = cancel_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
        })
        .await?;

    tracing::info!("Service stopped");
    Ok(())
}

use std::path::Path;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use reqwest::multipart::{Form, Part};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use video_process_rs::SERVICE_NAME;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Mode {
    Process,
    Convert,
}

impl Mode {
    fn path(self) -> &'static str {
        match self {
            Mode::Process => "process",
            Mode::Convert => "convert",
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(version = env!("CARGO_APP_VERSION"), name = SERVICE_NAME, about="Client for video-process-rs",
    long_about = None)]
struct Args {
    /// Service URL
    #[arg(short, long, env, default_value = "http://127.0.0.1:3000")]
    url: String,
    /// Input video file
    #[arg(short = 'i', long, env, default_value = "1.webm")]
    file: String,
    /// Endpoint to call
    #[arg(short, long, value_enum, default_value = "convert")]
    mode: Mode,
    /// Output file, defaults to <file>.<mode>.mp4
    #[arg(short, long)]
    output: Option<String>,
    #[arg(long)]
    crop_x: Option<i64>,
    #[arg(long)]
    crop_y: Option<i64>,
    #[arg(long)]
    crop_w: Option<i64>,
    #[arg(long)]
    crop_h: Option<i64>,
    #[arg(long)]
    scale_w: Option<i64>,
    #[arg(long)]
    scale_h: Option<i64>,
    #[arg(long)]
    bitrate: Option<String>,
    /// Send n times
    #[arg(short, long, env, default_value = "1")]
    times: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::Layer::default().compact())
        .init();
    let args = Args::parse();
    if let Err(e) = main_int(args).await {
        tracing::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn main_int(args: Args) -> anyhow::Result<()> {
    tracing::info!(name = SERVICE_NAME, "Starting HTTP client");
    tracing::info!(version = env!("CARGO_APP_VERSION"));
    tracing::info!(url = args.url);
    tracing::info!(file = args.file);
    tracing::info!(mode = args.mode.path());

    let client = reqwest::Client::new();
    let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(5);
    Retry::spawn(strategy, || check_health(&client, &args.url)).await?;

    let video = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("read file: {}", args.file))?;

    for i in 0..args.times {
        let data = transcode(&client, &args, video.clone())
            .await
            .with_context(|| format!("{} file: {}", args.mode.path(), args.file))?;
        let output_file = args
            .output
            .clone()
            .unwrap_or_else(|| format!("{}.{}.mp4", args.file, args.mode.path()));
        tracing::info!(i, output_file, len = data.len(), "saving...");
        tokio::fs::write(&output_file, &data)
            .await
            .with_context(|| format!("failed to write file: {}", output_file))?;
    }
    Ok(())
}

async fn transcode(client: &reqwest::Client, args: &Args, video: Vec<u8>) -> anyhow::Result<Vec<u8>> {
    let file_name = Path::new(&args.file)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let mut form = Form::new().part("video", Part::bytes(video).file_name(file_name));

    if let Mode::Process = args.mode {
        let fields = [
            ("cropX", args.crop_x.map(|v| v.to_string())),
            ("cropY", args.crop_y.map(|v| v.to_string())),
            ("cropW", args.crop_w.map(|v| v.to_string())),
            ("cropH", args.crop_h.map(|v| v.to_string())),
            ("scaleW", args.scale_w.map(|v| v.to_string())),
            ("scaleH", args.scale_h.map(|v| v.to_string())),
            ("bitrate", args.bitrate.clone()),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                form = form.text(name, value);
            }
        }
    }

    tracing::info!(message = "Sending request");
    let res = client
        .post(format!("{}/{}", args.url.trim_end_matches('/'), args.mode.path()))
        .multipart(form)
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        let body: serde_json::Value = res.json().await.unwrap_or_default();
        anyhow::bail!("service returned {}: {}", status, body);
    }
    Ok(res.bytes().await?.to_vec())
}

async fn check_health(client: &reqwest::Client, url: &str) -> anyhow::Result<()> {
    let res: serde_json::Value = client
        .get(format!("{}/health", url.trim_end_matches('/')))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    tracing::info!(status = %res["status"], "got a response.");
    if res["status"] != "healthy" {
        return Err(anyhow::anyhow!("Service is not healthy"));
    }
    Ok(())
}

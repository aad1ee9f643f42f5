#![allow(dead_code)]

use std::path::Path;

use axum::{
    body::{Body, Bytes},
    http::{header, Method, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use video_process_rs::{
    api::{create_app, AppState},
    config::Config,
    ffmpeg::FFMpegWrapper,
    service::Service,
};

pub const BOUNDARY: &str = "testboundary7MA4YWxkTrZu0gW";

pub struct TestApp {
    pub app: Router,
    pub tmp: TempDir,
}

impl TestApp {
    pub fn new(engine: &str) -> Self {
        Self::with_limit(engine, 500)
    }

    pub fn with_limit(engine: &str, max_upload_mb: usize) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::new(
            0,
            Some(tmp.path().to_path_buf()),
            engine.to_string(),
            max_upload_mb,
        );
        let service = Service::new(FFMpegWrapper::new(engine), config.temp_dir.clone());
        let app = create_app(AppState::new(service, config));
        Self { app, tmp }
    }

    /// Files left behind in the service temp dir.
    pub fn leftovers(&self) -> usize {
        entries(self.tmp.path())
    }
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

pub fn multipart_body(video_first: bool, fields: &[(&str, &str)], video: Option<&[u8]>) -> Vec<u8> {
    let mut text = Vec::new();
    for (name, value) in fields {
        text.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    let mut file = Vec::new();
    if let Some(video) = video {
        file.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"video\"; filename=\"clip.webm\"\r\nContent-Type: video/webm\r\n\r\n"
            )
            .as_bytes(),
        );
        file.extend_from_slice(video);
        file.extend_from_slice(b"\r\n");
    }

    let mut body = Vec::new();
    if video_first {
        body.extend(file);
        body.extend(text);
    } else {
        body.extend(text);
        body.extend(file);
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload(uri: &str, fields: &[(&str, &str)], video: Option<&[u8]>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(true, fields, video)))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(res: Response<Body>) -> Bytes {
    res.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(res: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}

#[cfg(unix)]
pub mod engines {
    //! Shell scripts standing in for ffmpeg, all written before any test spawns.

    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::OnceLock;

    use tempfile::TempDir;

    const SCRIPTS: [(&str, &str); 4] = [
        (
            "echo_args",
            r#"for last; do :; done
printf '%s\n' "$@" > "$last""#,
        ),
        (
            "copy",
            r#"prev=""
for a; do
  if [ "$prev" = "-i" ]; then in="$a"; fi
  prev="$a"
done
cat "$in" > "$prev""#,
        ),
        (
            "fail",
            r#"echo "Invalid data found when processing input" >&2
exit 1"#,
        ),
        (
            "slow",
            r#"prev=""
for a; do
  if [ "$prev" = "-i" ]; then in="$a"; fi
  prev="$a"
done
sleep 1
cat "$in" > "$prev""#,
        ),
    ];

    fn dir() -> &'static TempDir {
        static DIR: OnceLock<TempDir> = OnceLock::new();
        DIR.get_or_init(|| {
            let dir = tempfile::Builder::new()
                .prefix("fake-ffmpeg")
                .tempdir_in(env!("CARGO_TARGET_TMPDIR"))
                .unwrap();
            for (name, body) in SCRIPTS {
                write_script(&dir.path().join(name), body);
            }
            dir
        })
    }

    fn write_script(path: &Path, body: &str) {
        std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn engine(name: &str) -> String {
        dir().path().join(name).to_string_lossy().into_owned()
    }
}

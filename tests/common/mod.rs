#![allow(dead_code)]

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request};
use http_body_util::BodyExt;
use sea_orm::{ConnectOptions, Database};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use toolsite_backend::config::{AppConfig, MailTransportConfig};
use toolsite_backend::infrastructure::database::run_migrations;
use toolsite_backend::services::mailer::Mailer;
use toolsite_backend::services::process::{
    ProcessError, ProcessOutput, ProcessRunner, ProcessSpec,
};
use toolsite_backend::services::storage::LocalArtifactStore;
use toolsite_backend::{AppState, create_app};

pub const BOUNDARY: &str = "----toolsite-test-boundary";

/// Stands in for ffmpeg: writes a fixed-size output to the last argument.
pub struct FakeFfmpeg {
    pub output_size: usize,
}

#[async_trait]
impl ProcessRunner for FakeFfmpeg {
    async fn run(&self, spec: ProcessSpec) -> Result<ProcessOutput, ProcessError> {
        let out = spec.args.last().cloned().unwrap();
        std::fs::write(PathBuf::from(out), vec![7u8; self.output_size]).unwrap();
        Ok(ProcessOutput {
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

pub struct TestApp {
    pub app: Router,
    pub public: TempDir,
    pub temp: TempDir,
    pub outbox: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_runner(Arc::new(FakeFfmpeg { output_size: 100 })).await
    }

    pub async fn with_runner(runner: Arc<dyn ProcessRunner>) -> Self {
        let public = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let outbox = tempfile::tempdir().unwrap();

        let mut config = AppConfig::development();
        config.server.public_dir = public.path().to_path_buf();
        config.server.temp_dir = temp.path().to_path_buf();
        config.mail.transport = MailTransportConfig::File {
            path: outbox.path().to_path_buf(),
        };

        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.unwrap();
        run_migrations(&db).await.unwrap();

        let storage = Arc::new(LocalArtifactStore::new(public.path()));
        let mailer = Mailer::new(&config.mail).unwrap();
        let state = AppState::new(db, config, storage, runner, mailer);

        Self {
            app: create_app(state),
            public,
            temp,
            outbox,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (u16, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status().as_u16();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (u16, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn json(&self, method: &str, uri: &str, body: Value) -> (u16, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn multipart(&self, uri: &str, parts: &[Part<'_>]) -> (u16, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap(),
        )
        .await
    }

    pub fn temp_is_empty(&self) -> bool {
        std::fs::read_dir(self.temp.path()).unwrap().next().is_none()
    }
}

pub enum Part<'a> {
    File {
        field: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: Vec<u8>,
    },
    Text {
        field: &'a str,
        value: &'a str,
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                field,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        field, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { field, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        field, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A small opaque RGBA PNG.
pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(16, 16, image::Rgba([200, 40, 40, 255]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, image::ImageOutputFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// A PDF with `pages` empty A4 pages.
pub fn pdf_bytes(pages: usize) -> Vec<u8> {
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

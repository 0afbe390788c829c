mod common;

use common::{FakeFfmpeg, Part, TestApp, pdf_bytes, png_bytes};
use serde_json::json;
use std::sync::Arc;

fn public_file(t: &TestApp, url: &str) -> std::path::PathBuf {
    t.public.path().join(url.trim_start_matches("/uploads/"))
}

#[tokio::test]
async fn test_compress_image_flow() {
    let t = TestApp::new().await;
    let png = png_bytes();

    let (status, body) = t
        .multipart(
            "/api/media/compress-image",
            &[
                Part::File {
                    field: "image",
                    file_name: "photo.png",
                    content_type: "image/png",
                    bytes: png.clone(),
                },
                Part::Text {
                    field: "quality",
                    value: "low",
                },
            ],
        )
        .await;

    assert_eq!(status, 200, "compress failed: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Image successfully compressed");
    assert_eq!(body["originalSize"], png.len() as u64);
    assert!(body["fileName"].as_str().unwrap().ends_with(".jpg"));

    let url = body["downloadUrl"].as_str().unwrap();
    assert!(url.starts_with("/uploads/compressed_images/"));
    assert!(public_file(&t, url).exists());
    assert!(t.temp_is_empty());
}

#[tokio::test]
async fn test_compress_image_rejects_wrong_type() {
    let t = TestApp::new().await;

    let (status, body) = t
        .multipart(
            "/api/media/compress-image",
            &[Part::File {
                field: "image",
                file_name: "notes.txt",
                content_type: "text/plain",
                bytes: b"hello".to_vec(),
            }],
        )
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("Invalid file type"));
    assert!(t.temp_is_empty());
}

#[tokio::test]
async fn test_compress_image_without_file() {
    let t = TestApp::new().await;

    let (status, body) = t
        .multipart(
            "/api/media/compress-image",
            &[Part::Text {
                field: "quality",
                value: "high",
            }],
        )
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["message"], "Please provide an image file to compress.");
}

#[tokio::test]
async fn test_compress_audio_reports_sizes() {
    let t = TestApp::with_runner(Arc::new(FakeFfmpeg { output_size: 100 })).await;

    let (status, body) = t
        .multipart(
            "/api/media/compress-audio",
            &[
                Part::File {
                    field: "audio",
                    file_name: "Song.MP3",
                    content_type: "audio/mpeg",
                    bytes: vec![1u8; 1000],
                },
                Part::Text {
                    field: "mode",
                    value: "targetSize",
                },
                Part::Text {
                    field: "targetSize",
                    value: "500",
                },
            ],
        )
        .await;

    assert_eq!(status, 200, "compress failed: {}", body);
    assert_eq!(body["originalSize"], 1000);
    assert_eq!(body["compressedSize"], 100);
    assert_eq!(body["compressionRate"], 90);
    assert!(body["fileName"].as_str().unwrap().ends_with(".mp3"));
    assert!(
        body["downloadUrl"]
            .as_str()
            .unwrap()
            .starts_with("/uploads/compressed_audio/")
    );
    assert!(t.temp_is_empty());
}

#[tokio::test]
async fn test_compress_video_reports_sizes() {
    let t = TestApp::with_runner(Arc::new(FakeFfmpeg { output_size: 400 })).await;

    let (status, body) = t
        .multipart(
            "/api/media/compress-video",
            &[Part::File {
                field: "video",
                file_name: "clip.mp4",
                content_type: "video/mp4",
                bytes: vec![3u8; 2000],
            }],
        )
        .await;

    assert_eq!(status, 200, "compress failed: {}", body);
    assert_eq!(body["message"], "Video successfully compressed");
    assert_eq!(body["compressionRate"], 80);
    assert!(t.temp_is_empty());
}

#[tokio::test]
async fn test_remove_background_falls_through_to_local() {
    let t = TestApp::new().await;

    let (status, body) = t
        .multipart(
            "/api/media/remove-bg",
            &[Part::File {
                field: "image",
                file_name: "portrait.png",
                content_type: "image/png",
                bytes: png_bytes(),
            }],
        )
        .await;

    assert_eq!(status, 200, "remove-bg failed: {}", body);
    assert_eq!(body["method"], "local");
    assert_eq!(body["downloadUrl"], body["imageUrl"]);

    let url = body["imageUrl"].as_str().unwrap();
    assert!(url.starts_with("/uploads/background_removed/"));
    let stored = image::open(public_file(&t, url)).unwrap();
    assert!(stored.color().has_alpha());
    assert!(t.temp_is_empty());
}

#[tokio::test]
async fn test_remove_background_signals_fallback() {
    let t = TestApp::new().await;

    // Passes the MIME check but cannot be decoded by any strategy.
    let (status, body) = t
        .multipart(
            "/api/media/remove-bg",
            &[Part::File {
                field: "image",
                file_name: "broken.png",
                content_type: "image/png",
                bytes: b"definitely not a png".to_vec(),
            }],
        )
        .await;

    assert_eq!(status, 500);
    assert_eq!(body["success"], false);
    assert_eq!(body["fallback"], true);
    assert_eq!(
        body["message"],
        "Server-side background removal failed. Please try client-side processing."
    );
    assert!(t.temp_is_empty());
}

#[tokio::test]
async fn test_merge_pdfs_flow() {
    let t = TestApp::new().await;

    let (status, body) = t
        .multipart(
            "/api/pdf/merge",
            &[
                Part::File {
                    field: "pdfs",
                    file_name: "a.pdf",
                    content_type: "application/pdf",
                    bytes: pdf_bytes(2),
                },
                Part::File {
                    field: "pdfs",
                    file_name: "b.pdf",
                    content_type: "application/pdf",
                    bytes: pdf_bytes(1),
                },
            ],
        )
        .await;

    assert_eq!(status, 200, "merge failed: {}", body);
    assert_eq!(body["message"], "PDFs merged successfully!");
    assert_eq!(body["pageCount"], 3);

    let url = body["downloadUrl"].as_str().unwrap();
    assert!(url.starts_with("/uploads/merged-"));
    let merged = lopdf::Document::load(public_file(&t, url)).unwrap();
    assert_eq!(merged.get_pages().len(), 3);
    assert!(t.temp_is_empty());
}

#[tokio::test]
async fn test_merge_requires_two_files() {
    let t = TestApp::new().await;

    let (status, body) = t
        .multipart(
            "/api/pdf/merge",
            &[Part::File {
                field: "pdfs",
                file_name: "only.pdf",
                content_type: "application/pdf",
                bytes: pdf_bytes(1),
            }],
        )
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["message"], "Please upload at least two PDF files to merge.");
    assert!(t.temp_is_empty());
}

#[tokio::test]
async fn test_merge_rejects_non_pdf() {
    let t = TestApp::new().await;

    let (status, body) = t
        .multipart(
            "/api/pdf/merge",
            &[
                Part::File {
                    field: "pdfs",
                    file_name: "a.pdf",
                    content_type: "application/pdf",
                    bytes: pdf_bytes(1),
                },
                Part::File {
                    field: "pdfs",
                    file_name: "b.png",
                    content_type: "image/png",
                    bytes: png_bytes(),
                },
            ],
        )
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["message"], "Only PDF files are allowed.");
    assert!(t.temp_is_empty());
}

#[tokio::test]
async fn test_merge_with_no_readable_pages() {
    let t = TestApp::new().await;

    let (status, body) = t
        .multipart(
            "/api/pdf/merge",
            &[
                Part::File {
                    field: "pdfs",
                    file_name: "a.pdf",
                    content_type: "application/pdf",
                    bytes: b"garbage".to_vec(),
                },
                Part::File {
                    field: "pdfs",
                    file_name: "b.pdf",
                    content_type: "application/pdf",
                    bytes: b"more garbage".to_vec(),
                },
            ],
        )
        .await;

    assert_eq!(status, 500);
    assert_eq!(
        body["message"],
        "No valid PDF pages were found in the uploaded files."
    );
}

#[tokio::test]
async fn test_html_to_react() {
    let t = TestApp::new().await;

    let (status, body) = t
        .json(
            "POST",
            "/api/converter/html-to-react",
            json!({ "htmlCode": "<div class=\"box\"><img src=\"a.png\"></div>" }),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["message"], "HTML converted to React successfully");
    let code = body["reactCode"].as_str().unwrap();
    assert!(code.contains("className=\"box\""));
    assert!(code.contains("<img src=\"a.png\" />"));

    let (status, body) = t
        .json("POST", "/api/converter/html-to-react", json!({ "htmlCode": "" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "HTML code is required");
}

#[tokio::test]
async fn test_contact_message_is_delivered() {
    let t = TestApp::new().await;

    let (status, body) = t
        .json(
            "POST",
            "/api/contact/send-message",
            json!({
                "name": "Alex",
                "email": "alex@example.com",
                "subject": "Feature request",
                "message": "Please add <b>OCR</b>",
            }),
        )
        .await;

    assert_eq!(status, 200, "send failed: {}", body);
    assert_eq!(body["message"], "Your message has been sent successfully!");

    let mails: Vec<_> = std::fs::read_dir(t.outbox.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "eml"))
        .collect();
    assert_eq!(mails.len(), 1);
    let raw = std::fs::read_to_string(&mails[0]).unwrap();
    assert!(raw.contains("Tool Website Contact: Feature request"));
    assert!(raw.contains("alex@example.com"));
}

#[tokio::test]
async fn test_contact_validation() {
    let t = TestApp::new().await;

    let (status, body) = t
        .json(
            "POST",
            "/api/contact/send-message",
            json!({ "name": "Alex", "email": "alex@example.com", "subject": "Hi" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Please provide name, email, subject and message.");

    let (status, body) = t
        .json(
            "POST",
            "/api/contact/send-message",
            json!({
                "name": "Alex",
                "email": "not-an-email",
                "subject": "Hi",
                "message": "Hello",
            }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Please provide a valid email address.");
}

//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and knows how the `/recommend` form is laid out.
//! When the form changes, update only this file.
#![allow(dead_code)]

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

fn file_part(bytes: Vec<u8>, filename: &str, mime: &str) -> Part {
    Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str(mime)
        .expect("Invalid mime type")
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    pub async fn health(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }

    pub async fn recommend_form(&self, form: Form) -> Response {
        self.client
            .post(format!("{}/recommend", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("Recommend request failed")
    }

    pub async fn recommend_text(&self, text: &str) -> Response {
        self.recommend_form(Form::new().text("text", text.to_string()))
            .await
    }

    pub async fn recommend_image(&self, bytes: Vec<u8>, filename: &str, mime: &str) -> Response {
        self.recommend_form(Form::new().part("file", file_part(bytes, filename, mime)))
            .await
    }

    pub async fn recommend_both(&self, text: &str, bytes: Vec<u8>) -> Response {
        let form = Form::new()
            .text("text", text.to_string())
            .part("file", file_part(bytes, "face.png", "image/png"));
        self.recommend_form(form).await
    }

    /// A form carrying neither input, only an unrelated field.
    pub async fn recommend_nothing(&self) -> Response {
        self.recommend_form(Form::new().text("comment", "hello".to_string()))
            .await
    }

    pub async fn preflight(&self, origin: &str) -> Response {
        self.client
            .request(
                reqwest::Method::OPTIONS,
                format!("{}/recommend", self.base_url),
            )
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .send()
            .await
            .expect("Preflight request failed")
    }
}

use std::path::Path;

use anyhow::{bail, Context, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::info;

use crate::http::send_with_retry;

const IMGUR_UPLOAD_URL: &str = "https://api.imgur.com/3/upload";

#[derive(Debug, Deserialize)]
struct ImgurResponse {
    #[serde(default)]
    success: bool,
    data: Option<ImgurData>,
}

#[derive(Debug, Deserialize)]
struct ImgurData {
    link: Option<String>,
    error: Option<serde_json::Value>,
}

/// Upload an image file to Imgur and return its public link.
pub async fn upload_image(client: &reqwest::Client, client_id: &str, path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.jpg".to_string());

    info!("Uploading {} ({} bytes) to Imgur", path.display(), bytes.len());
    let response = send_with_retry("Imgur upload", || {
        let form = Form::new()
            .part("image", Part::bytes(bytes.clone()).file_name(file_name.clone()))
            .text("type", "file");
        client
            .post(IMGUR_UPLOAD_URL)
            .header("Authorization", format!("Client-ID {}", client_id))
            .multipart(form)
    })
    .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Imgur upload failed with {}: {}", status, body);
    }

    let parsed: ImgurResponse = response
        .json()
        .await
        .context("Failed to parse Imgur response")?;
    let link = link_from(parsed)?;
    info!("Image hosted at {}", link);
    Ok(link)
}

fn link_from(response: ImgurResponse) -> Result<String> {
    let data = response.data.context("Imgur response has no data")?;
    match data.link {
        Some(link) if response.success && !link.is_empty() => Ok(link),
        _ => bail!(
            "Imgur did not return a link: {}",
            data.error.map(|e| e.to_string()).unwrap_or_default()
        ),
    }
}

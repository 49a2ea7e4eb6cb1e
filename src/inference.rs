use std::time::Instant;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::http::send_with_retry;
use crate::settings::Settings;

const PROMPT: &str = "Identify the given object. Answer in labeled sections separated by blank lines, \
each starting with its label followed by a colon.\n\n\
Item Name: the name of the object.\n\
Components: the electrical components used in the object, as a comma-separated list of names only \
(e.g. Microcontroller, Button Switch, Optical Sensor).\n\
Projects: possible projects or devices that can be built using only the listed components, one per line.\n\
Serial Flow Diagram: how the components are interconnected and work together.\n\
Components Table: one line per pin in the form `component - pin - description`.\n\
Project Diagrams: a short flow for each suggested project, one per line.\n\
Carbon Footprint: the estimated carbon footprint of each component from standard industry data, \
one line per component in the form `component: footprint`.\n\
Reengineering Guide: a step-by-step guide using sustainable or eco-friendly alternatives for each \
component, where available.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Raw model output for one image.
#[derive(Debug, Clone)]
pub struct Description {
    pub text: String,
    pub latency_ms: i64,
}

fn build_request<'a>(model: &'a str, max_tokens: u32, image_url: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: vec![
                ContentPart::Text { text: PROMPT },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: image_url },
                },
            ],
        }],
        max_tokens,
    }
}

fn content_of(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    if content.trim().is_empty() {
        bail!("No description received from the model");
    }
    Ok(content)
}

/// Ask the vision model to describe the image behind `image_url`.
pub async fn describe_image(
    client: &reqwest::Client,
    settings: &Settings,
    image_url: &str,
) -> Result<Description> {
    let api_key = settings.hf_api_key()?;
    let body = build_request(&settings.model, settings.max_tokens, image_url);
    let endpoint = format!("{}/chat/completions", settings.inference_url.trim_end_matches('/'));

    info!(model = %settings.model, "Requesting description for {}", image_url);
    let start = Instant::now();
    let response = send_with_retry("Inference", || {
        client.post(&endpoint).bearer_auth(api_key).json(&body)
    })
    .await?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        bail!("Inference API returned {}: {}", status, error_body);
    }

    let parsed: ChatResponse = response
        .json()
        .await
        .context("Failed to parse inference response")?;
    let text = content_of(parsed)?;
    let latency_ms = start.elapsed().as_millis() as i64;
    debug!(latency_ms, chars = text.len(), "Raw description: {}", text);

    Ok(Description { text, latency_ms })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_shape() {
        let req = build_request("meta-llama/Llama-3.2-11B-Vision-Instruct", 2000, "https://i.imgur.com/a.jpg");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "meta-llama/Llama-3.2-11B-Vision-Instruct");
        assert_eq!(json["max_tokens"], 2000);
        let content = &json["messages"][0]["content"];
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "https://i.imgur.com/a.jpg");
    }

    #[test]
    fn prompt_names_every_section() {
        let lower = PROMPT.to_lowercase();
        for label in [
            "item name:",
            "components:",
            "projects:",
            "serial flow diagram:",
            "components table:",
            "project diagrams:",
            "carbon footprint:",
            "reengineering guide:",
        ] {
            assert!(lower.contains(label), "prompt is missing {}", label);
        }
    }

    #[test]
    fn first_choice_content() {
        let json = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Item Name: Lamp"}}]}"#;
        assert_eq!(content_of(serde_json::from_str(json).unwrap()).unwrap(), "Item Name: Lamp");
    }

    #[test]
    fn empty_content_is_error() {
        for json in [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
        ] {
            assert!(content_of(serde_json::from_str(json).unwrap()).is_err(), "{}", json);
        }
    }
}

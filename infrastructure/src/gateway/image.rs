//! Duck-typed image response decoding.
//!
//! Image-capable upstreams answer in several shapes. Decoding is an ordered
//! list of candidate extractors; the first non-empty match wins.

use council_application::ImageOutput;
use serde_json::Value;

type Extractor = fn(&Value) -> Option<ImageOutput>;

/// Candidate extractors, probed in order.
const EXTRACTORS: &[Extractor] = &[
    chat_content_string,
    chat_content_object,
    data_url,
    data_b64,
    top_level,
];

/// Decode an image payload, or `None` when no known shape matches.
pub fn extract_image(body: &Value) -> Option<ImageOutput> {
    EXTRACTORS.iter().find_map(|extract| extract(body))
}

fn output_from_str(s: &str) -> Option<ImageOutput> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("data:") {
        Some(ImageOutput::Base64(trimmed.to_string()))
    } else {
        Some(ImageOutput::Url(trimmed.to_string()))
    }
}

/// `choices[0].message.content` as a plain URL or data URI.
fn chat_content_string(body: &Value) -> Option<ImageOutput> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .and_then(output_from_str)
}

/// `choices[0].message.content.url` or `.image`.
fn chat_content_object(body: &Value) -> Option<ImageOutput> {
    let content = &body["choices"][0]["message"]["content"];
    content["url"]
        .as_str()
        .or_else(|| content["image"].as_str())
        .and_then(output_from_str)
}

/// `data[0].url`.
fn data_url(body: &Value) -> Option<ImageOutput> {
    body["data"][0]["url"].as_str().and_then(output_from_str)
}

/// `data[0].b64_json`, wrapped as a PNG data URI.
fn data_b64(body: &Value) -> Option<ImageOutput> {
    body["data"][0]["b64_json"]
        .as_str()
        .filter(|b64| !b64.trim().is_empty())
        .map(|b64| ImageOutput::Base64(format!("data:image/png;base64,{}", b64)))
}

/// Top-level `url` or `image`.
fn top_level(body: &Value) -> Option<ImageOutput> {
    body["url"]
        .as_str()
        .or_else(|| body["image"].as_str())
        .and_then(output_from_str)
}

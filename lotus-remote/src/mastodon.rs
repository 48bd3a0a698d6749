//! Publishing statuses to a Mastodon instance.
//!
//! Attached images are downloaded from their URL, uploaded through the media
//! endpoint and referenced by id from the status. Mastodon rejects SVG, so an
//! SVG image is left off the post with a warning.

use std::io::Read;

use serde::Deserialize;

use lotus_core::config::MastodonConfig;
use lotus_core::types::PublicationId;
use lotus_engine::{AccessorError, Media, Post, Publisher};

use crate::http;

const BOUNDARY: &str = "daily-lotus-7f3c9a2e41b8d605";
const MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;

pub struct MastodonClient {
    statuses_url: String,
    media_url: String,
    token: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct Status {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    id: String,
}

/// A downloaded image ready for upload.
struct Image {
    bytes: Vec<u8>,
    mime_type: String,
}

impl MastodonClient {
    pub fn new(base_url: &str, token: impl Into<String>, user_agent: &str, timeout_secs: u64) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            statuses_url: format!("{base_url}/api/v1/statuses"),
            media_url: format!("{base_url}/api/v2/media"),
            token: token.into(),
            agent: http::agent(user_agent, timeout_secs),
        }
    }

    /// Build a client from configuration and the access token taken from the
    /// environment.
    pub fn from_config(
        config: &MastodonConfig,
        token: Option<String>,
        user_agent: &str,
    ) -> Result<Self, AccessorError> {
        let base_url = config.api_base_url.as_deref().ok_or_else(|| {
            AccessorError::MissingCredentials("mastodon.api_base_url is not set".to_owned())
        })?;
        let token = token.ok_or_else(|| {
            AccessorError::MissingCredentials(format!("{} is not set", config.access_token_env))
        })?;
        Ok(Self::new(base_url, token, user_agent, config.timeout_secs))
    }

    fn form<'a>(post: &'a Post, media_ids: &'a [String]) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![("status", post.text.as_str())];
        if let Some(reply_to) = &post.reply_to {
            form.push(("in_reply_to_id", reply_to.as_str()));
        }
        for id in media_ids {
            form.push(("media_ids[]", id.as_str()));
        }
        form
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn download(&self, url: &str) -> Result<Image, AccessorError> {
        tracing::debug!("GET {url}");
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| http::transport(url, err))?;
        let mime_type = response.content_type().to_owned();
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|err| AccessorError::Transport {
                endpoint: url.to_owned(),
                message: err.to_string(),
            })?;
        if bytes.len() as u64 > MAX_IMAGE_BYTES {
            return Err(AccessorError::Transport {
                endpoint: url.to_owned(),
                message: format!("image larger than {MAX_IMAGE_BYTES} bytes"),
            });
        }
        Ok(Image { bytes, mime_type })
    }

    /// Upload one image; `None` when it was skipped.
    fn upload(&self, media: &Media) -> Result<Option<String>, AccessorError> {
        let image = self.download(&media.url)?;
        if is_svg(&media.url, &image.mime_type) {
            tracing::warn!(url = %media.url, "SVG images cannot be attached; skipping");
            return Ok(None);
        }
        tracing::debug!(bytes = image.bytes.len(), "POST {}", self.media_url);
        let response = self
            .agent
            .post(&self.media_url)
            .set("Authorization", &self.authorization())
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .send_bytes(&multipart_body(&image, &media.alt_text))
            .map_err(|err| http::transport(&self.media_url, err))?;
        let attachment: Attachment = http::decode(&self.media_url, response)?;
        Ok(Some(attachment.id))
    }
}

impl Publisher for MastodonClient {
    fn publish(&self, post: &Post) -> Result<PublicationId, AccessorError> {
        let mut media_ids = Vec::with_capacity(post.media.len());
        for media in &post.media {
            if let Some(id) = self.upload(media)? {
                media_ids.push(id);
            }
        }

        tracing::debug!(reply_to = ?post.reply_to, media = media_ids.len(), "POST {}", self.statuses_url);
        let response = self
            .agent
            .post(&self.statuses_url)
            .set("Authorization", &self.authorization())
            .send_form(&Self::form(post, &media_ids))
            .map_err(|err| http::transport(&self.statuses_url, err))?;
        let status: Status = http::decode(&self.statuses_url, response)?;
        Ok(PublicationId::from(status.id))
    }
}

fn is_svg(url: &str, mime_type: &str) -> bool {
    mime_type == "image/svg+xml" || url.to_ascii_lowercase().ends_with(".svg")
}

fn file_name(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "image.png",
        "image/gif" => "image.gif",
        "image/webp" => "image.webp",
        _ => "image.jpg",
    }
}

/// `multipart/form-data` body with the `description` and `file` fields.
fn multipart_body(image: &Image, alt_text: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(image.bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"description\"\r\n\r\n{alt_text}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            file_name(&image.mime_type),
            image.mime_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(&image.bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

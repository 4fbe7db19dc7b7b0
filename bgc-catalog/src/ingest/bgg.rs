//! BoardGameGeek source adapter
//!
//! Fetches game data from the BGG XML API2 `thing` endpoint and normalizes
//! it into the same `GamePayload` shape a manual insert uses. The
//! orchestrator talks to the `BggSource` trait so tests can substitute a
//! scripted source.
//!
//! # API Reference
//! - Endpoint: https://boardgamegeek.com/xmlapi2/thing?id={id}&stats=1
//! - An unknown id answers with an empty `<items>` element, not an HTTP
//!   error; both map to `Ok(None)`.

use async_trait::async_trait;
use bgc_common::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;

use crate::ingest::payload::GamePayload;

/// BGG XML API2 base URL
const BGG_API_URL: &str = "https://boardgamegeek.com/xmlapi2";

/// Default timeout for BGG API requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// User-Agent header for outbound requests
const USER_AGENT: &str = "BGC/0.1.0 (board game catalog)";

/// Upstream game database, keyed by external id.
///
/// `Ok(None)` means the source has no record of the id; errors are
/// transport or decode failures, never "not found".
#[async_trait]
pub trait BggSource: Send + Sync {
    async fn fetch_by_id(&self, bgg_id: i64) -> Result<Option<GamePayload>>;
}

/// BGG client over the XML API2
pub struct BggClient {
    http_client: Client,
    base_url: String,
}

impl BggClient {
    /// Create a client against the public BGG API
    pub fn new() -> Self {
        Self::with_base_url(BGG_API_URL)
    }

    /// Create a client against an alternate base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .default_headers(headers)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
        }
    }
}

impl Default for BggClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BggSource for BggClient {
    async fn fetch_by_id(&self, bgg_id: i64) -> Result<Option<GamePayload>> {
        let url = format!("{}/thing?id={}&stats=1", self.base_url, bgg_id);
        debug!(bgg_id, "fetching game from BGG");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("BGG request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "BGG returned status {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Upstream(format!("BGG response read failed: {}", e)))?;

        let mut payload = parse_thing_payload(&body)?;
        if let Some(ref mut payload) = payload {
            payload.bgg_id.get_or_insert(bgg_id);
        }

        Ok(payload)
    }
}

/// Parse a `thing` response into a payload; `None` when the response
/// carries no item.
pub(crate) fn parse_thing_payload(xml_text: &str) -> Result<Option<GamePayload>> {
    let mut xml = Reader::from_str(xml_text);
    xml.config_mut().trim_text(true);

    let mut payload = GamePayload::default();
    let mut found_item = false;
    let mut in_item = false;
    let mut primary_name: Option<String> = None;
    let mut alternate_names: Vec<String> = Vec::new();
    let mut current_tag = String::new();

    loop {
        let event = xml
            .read_event()
            .map_err(|e| Error::Upstream(format!("invalid BGG response: {}", e)))?;

        match event {
            Event::Start(ref e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "item" && !in_item {
                    found_item = true;
                    in_item = true;
                    if let Some(id) = attr_value(e, b"id")? {
                        payload.bgg_id = id.parse().ok();
                    }
                } else if in_item {
                    current_tag = tag;
                }
            }
            Event::Empty(ref e) if in_item => {
                collect_empty_tag(e, &mut payload, &mut primary_name, &mut alternate_names)?;
            }
            Event::Text(ref e) if in_item => {
                let text = e
                    .unescape()
                    .map_err(|err| Error::Upstream(format!("invalid BGG response: {}", err)))?
                    .to_string();
                match current_tag.as_str() {
                    "thumbnail" => payload.thumbnail = Some(text),
                    "image" => payload.image = Some(text),
                    "description" => payload.description = Some(text),
                    _ => {}
                }
            }
            Event::End(ref e) => {
                let name = e.name();
                let tag = String::from_utf8_lossy(name.as_ref());
                if tag == "item" {
                    // Only the first item of a multi-id response is used
                    break;
                }
                current_tag.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !found_item {
        return Ok(None);
    }

    // Primary name leads the alias list
    payload.name = primary_name.into_iter().chain(alternate_names).collect();

    Ok(Some(payload))
}

fn collect_empty_tag(
    e: &BytesStart<'_>,
    payload: &mut GamePayload,
    primary_name: &mut Option<String>,
    alternate_names: &mut Vec<String>,
) -> Result<()> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
    match tag.as_str() {
        "name" => {
            let value = attr_value(e, b"value")?;
            let kind = attr_value(e, b"type")?;
            if let Some(value) = value {
                if kind.as_deref() == Some("primary") && primary_name.is_none() {
                    *primary_name = Some(value);
                } else {
                    alternate_names.push(value);
                }
            }
        }
        "yearpublished" => payload.published = numeric_attr(e)?,
        "minplayers" => payload.min_players = numeric_attr(e)?,
        "maxplayers" => payload.max_players = numeric_attr(e)?,
        "minage" => payload.min_player_age = numeric_attr(e)?,
        "playingtime" => payload.play_time = numeric_attr(e)?,
        "minplaytime" => payload.min_play_time = numeric_attr(e)?,
        "maxplaytime" => payload.max_play_time = numeric_attr(e)?,
        "averageweight" => {
            payload.complexity = attr_value(e, b"value")?.and_then(|v| v.parse().ok());
        }
        "link" => {
            let kind = attr_value(e, b"type")?;
            let value = attr_value(e, b"value")?;
            if let (Some(kind), Some(value)) = (kind, value) {
                match kind.as_str() {
                    "boardgamecategory" => payload.category.push(value),
                    "boardgamemechanic" => payload.mechanic.push(value),
                    "boardgamedesigner" => payload.designer.push(value),
                    "boardgameartist" => payload.artist.push(value),
                    "boardgamepublisher" => payload.publisher.push(value),
                    _ => {}
                }
            }
        }
        _ => {}
    }

    Ok(())
}

fn numeric_attr(e: &BytesStart<'_>) -> Result<Option<i64>> {
    Ok(attr_value(e, b"value")?.and_then(|v| v.parse().ok()))
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Upstream(format!("invalid BGG response: {}", err)))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|err| Error::Upstream(format!("invalid BGG response: {}", err)))?;
            return Ok(Some(value.to_string()));
        }
    }

    Ok(None)
}

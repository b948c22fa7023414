use std::time::{Duration, Instant};

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::{GameRecord, ProfileId};
use crate::error::AppManifestError;
use crate::games_xml::parse_games_xml;

pub const DEFAULT_BASE_URL: &str = "https://steamcommunity.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of the raw owned-games XML for a profile.
pub trait GamesSource: Send + Sync {
    fn fetch_xml(&self, profile: &ProfileId) -> Result<String, AppManifestError>;
}

#[derive(Clone)]
pub struct CommunityHttpClient {
    client: Client,
    base_url: Url,
}

impl CommunityHttpClient {
    pub fn new() -> Result<Self, AppManifestError> {
        Self::with_options(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_options(base_url: &str, timeout: Duration) -> Result<Self, AppManifestError> {
        let base_url = parse_base_url(base_url)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("steam-appmanifest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| AppManifestError::Network(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| AppManifestError::Network(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn games_url(&self, profile: &ProfileId) -> Url {
        games_url_from(&self.base_url, profile)
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, AppManifestError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .status()
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
        Err(AppManifestError::Status { status, message })
    }
}

impl GamesSource for CommunityHttpClient {
    fn fetch_xml(&self, profile: &ProfileId) -> Result<String, AppManifestError> {
        let url = self.games_url(profile);
        let started = Instant::now();
        tracing::debug!(%url, "community.request");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| AppManifestError::Network(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| AppManifestError::Network(err.to_string()))?;
        tracing::debug!(
            latency_ms = started.elapsed().as_millis() as u64,
            bytes = body.len(),
            "community.response"
        );
        Ok(body)
    }
}

/// Build `<base_url>/id/<profile>/games?tab=all&xml=1` with the profile id as
/// a single encoded path segment.
pub fn games_url(base_url: &str, profile: &ProfileId) -> Result<Url, AppManifestError> {
    Ok(games_url_from(&parse_base_url(base_url)?, profile))
}

fn parse_base_url(base_url: &str) -> Result<Url, AppManifestError> {
    let url = Url::parse(base_url)
        .map_err(|err| AppManifestError::ConfigParse(format!("invalid base_url {base_url:?}: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(AppManifestError::ConfigParse(format!(
            "invalid base_url {base_url:?}: not a hierarchical URL"
        )));
    }
    Ok(url)
}

fn games_url_from(base_url: &Url, profile: &ProfileId) -> Url {
    let mut url = base_url.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .push("id")
            .push(profile.as_str())
            .push("games");
    }
    url.set_query(Some("tab=all&xml=1"));
    url
}

/// Validate the profile id, download its games list and parse it.
///
/// A blank id fails with [`AppManifestError::EmptyInput`] before `source` is
/// touched.
pub fn fetch_games<S: GamesSource + ?Sized>(
    source: &S,
    profile_id: &str,
) -> Result<Vec<GameRecord>, AppManifestError> {
    let profile: ProfileId = profile_id.parse()?;
    let xml = source.fetch_xml(&profile)?;
    let games = parse_games_xml(&xml)?;
    tracing::info!(profile = %profile, games = games.len(), "fetched owned games");
    Ok(games)
}

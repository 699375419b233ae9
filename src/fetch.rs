use crate::config::{AppConfig, FetchMode, resolve_path};
use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;
use url::Url;

#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub source_url: String,
    pub body: String,
    pub page: u32,
}

pub fn build_client(
    user_agent: &str,
    extra_headers: &BTreeMap<String, String>,
    timeout: Duration,
) -> Result<Client> {
    let mut headers = HeaderMap::new();
    for (k, v) in extra_headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .with_context(|| format!("invalid header name {k}"))?;
        let value =
            HeaderValue::from_str(v).with_context(|| format!("invalid header value for {k}"))?;
        headers.insert(name, value);
    }
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent).context("invalid user agent")?,
    );

    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .context("failed to build reqwest client")
}

pub fn fetch_listing(config: &AppConfig) -> Result<FetchedDocument> {
    match config.fetch.mode {
        FetchMode::Http => fetch_http_listing(config),
        FetchMode::File => fetch_file_listing(config),
    }
}

fn fetch_http_listing(config: &AppConfig) -> Result<FetchedDocument> {
    let client = build_client(
        &config.fetch.user_agent,
        &config.fetch.headers,
        Duration::from_secs(config.fetch.timeout_secs),
    )?;
    let url = build_listing_url(
        &config.source.base_url,
        &config.listing.order_by,
        &config.listing.order_direction,
        config.listing.page,
    )?;

    let resp = client
        .get(&url)
        .send()
        .with_context(|| format!("request to {url} failed"))?;
    if !resp.status().is_success() {
        bail!("request to {url} failed with status {}", resp.status());
    }
    let body = resp
        .text()
        .with_context(|| format!("failed to read listing body from {url}"))?;

    info!(page = config.listing.page, bytes = body.len(), %url, "fetched listing page");

    Ok(FetchedDocument {
        source_url: url,
        body,
        page: config.listing.page,
    })
}

fn fetch_file_listing(config: &AppConfig) -> Result<FetchedDocument> {
    let file_path = config
        .fetch
        .listing_file
        .as_ref()
        .context("fetch.listing_file missing for file mode")?;
    let resolved = resolve_path(config.origin.as_deref(), file_path)?;
    let body = std::fs::read_to_string(&resolved)
        .with_context(|| format!("failed to read listing file {}", resolved.display()))?;

    info!(
        file = %resolved.display(),
        bytes = body.len(),
        "loaded listing file"
    );

    Ok(FetchedDocument {
        source_url: format!("file://{}", resolved.display()),
        body,
        page: config.listing.page,
    })
}

pub fn build_listing_url(
    base_url: &str,
    order_by: &str,
    order_direction: &str,
    page: u32,
) -> Result<String> {
    let base = Url::parse(base_url).with_context(|| format!("invalid base_url {base_url}"))?;
    let mut url = join_base_path(&base, "/tickets")?;

    url.query_pairs_mut()
        .clear()
        .append_pair("order[by]", order_by)
        .append_pair("order[direction]", order_direction)
        .append_pair("page", &page.to_string());

    Ok(url.to_string())
}

pub fn join_base_path(base: &Url, path: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| anyhow!("base url cannot carry a path: {base}"))?
        .pop_if_empty()
        .extend(path.split('/').filter(|segment| !segment.is_empty()));
    Ok(url)
}

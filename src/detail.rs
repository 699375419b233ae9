use crate::dom::{class_matches, descendants, descendants_named, flatten_text, href};
use crate::extract::attr_lat_lng;
use crate::fetch::{build_client, join_base_path};
use crate::model::DetailFields;
use crate::patterns::{
    AT_LAT_LNG, DETAIL_CONTENT_CLASS, ENCODED_LL, JSON_LAT, JSON_LATITUDE, JSON_LNG,
    JSON_LONGITUDE, first_group, format_coordinates, paired_groups, query_lat_lng,
};
use anyhow::{Context, Result, bail};
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const MIN_DETAIL_DESCRIPTION_CHARS: usize = 10;

pub trait DetailSource: Send + Sync {
    fn key(&self) -> &'static str;
    fn fetch_page(&self, path: &str) -> Result<String>;
}

pub struct HttpDetailSource {
    client: Client,
    base_url: Url,
}

impl HttpDetailSource {
    pub fn new(
        base_url: &str,
        user_agent: &str,
        headers: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid base_url {base_url}"))?;
        let client = build_client(user_agent, headers, timeout)?;
        Ok(Self { client, base_url })
    }
}

impl DetailSource for HttpDetailSource {
    fn key(&self) -> &'static str {
        "http"
    }

    fn fetch_page(&self, path: &str) -> Result<String> {
        let url = join_base_path(&self.base_url, path)?;
        let resp = self
            .client
            .get(url.as_str())
            .send()
            .with_context(|| format!("request to {url} failed"))?;
        if !resp.status().is_success() {
            bail!("request to {url} failed with status {}", resp.status());
        }
        resp.text()
            .with_context(|| format!("failed to read body from {url}"))
    }
}

pub struct DirDetailSource {
    dir: PathBuf,
}

impl DirDetailSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DetailSource for DirDetailSource {
    fn key(&self) -> &'static str {
        "dir"
    }

    fn fetch_page(&self, path: &str) -> Result<String> {
        let name = path.trim_start_matches("/tickets/").trim_matches('/');
        if name.is_empty() || name.contains('/') {
            bail!("unsupported ticket path {path}");
        }
        let file = self.dir.join(format!("{name}.html"));
        std::fs::read_to_string(&file)
            .with_context(|| format!("failed to read detail page {}", file.display()))
    }
}

pub fn normalize_ticket_path(id: &str) -> String {
    let id = id.trim();
    if id.starts_with("/tickets/") {
        id.to_string()
    } else if let Some(digits) = id.strip_prefix('#') {
        format!("/tickets/{}", digits.trim_start_matches('#'))
    } else if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        format!("/tickets/{id}")
    } else {
        id.to_string()
    }
}

pub fn try_fetch_ticket_detail(source: &dyn DetailSource, id: &str) -> Result<DetailFields> {
    let path = normalize_ticket_path(id);
    let body = source
        .fetch_page(&path)
        .with_context(|| format!("detail fetch failed for {path}"))?;
    let fields = parse_detail_page(&body);
    debug!(
        source = source.key(),
        %path,
        description = fields.description.is_some(),
        coordinates = fields.coordinates.is_some(),
        "parsed detail page"
    );
    Ok(fields)
}

pub fn fetch_ticket_detail(source: &dyn DetailSource, id: &str) -> DetailFields {
    match try_fetch_ticket_detail(source, id) {
        Ok(fields) => fields,
        Err(err) => {
            let error = format!("{err:#}");
            warn!(ticket = %id, %error, "detail enrichment unavailable");
            DetailFields::default()
        }
    }
}

pub fn parse_detail_page(html: &str) -> DetailFields {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    DetailFields {
        description: detail_description(root),
        coordinates: detail_coordinates(root),
    }
}

fn content_region(root: ElementRef<'_>) -> ElementRef<'_> {
    descendants_named(root, "main")
        .next()
        .or_else(|| descendants_named(root, "article").next())
        .unwrap_or(root)
}

fn detail_description(root: ElementRef<'_>) -> Option<String> {
    let region = content_region(root);
    let strategies: [(&str, Option<&Regex>); 3] = [
        ("p", None),
        ("div", Some(&*DETAIL_CONTENT_CLASS)),
        ("section", Some(&*DETAIL_CONTENT_CLASS)),
    ];

    strategies.into_iter().find_map(|(tag, class_re)| {
        descendants_named(region, tag)
            .filter(|el| class_re.is_none_or(|re| class_matches(*el, re)))
            .map(flatten_text)
            .find(|text| text.chars().count() > MIN_DETAIL_DESCRIPTION_CHARS)
    })
}

fn detail_coordinates(root: ElementRef<'_>) -> Option<String> {
    let strategies: [fn(ElementRef<'_>) -> Option<(String, String)>; 4] = [
        coords_from_data_attrs,
        coords_from_iframe,
        coords_from_links,
        coords_from_scripts,
    ];
    let (lat, lng) = strategies.into_iter().find_map(|strategy| strategy(root))?;
    Some(format_coordinates(&lat, &lng))
}

fn coords_from_data_attrs(root: ElementRef<'_>) -> Option<(String, String)> {
    descendants(root)
        .find_map(attr_lat_lng)
        .map(|(lat, lng)| (lat.to_string(), lng.to_string()))
}

fn coords_from_iframe(root: ElementRef<'_>) -> Option<(String, String)> {
    descendants_named(root, "iframe")
        .filter_map(|frame| frame.value().attr("src"))
        .find_map(|src| paired_groups(&AT_LAT_LNG, src))
}

fn coords_from_links(root: ElementRef<'_>) -> Option<(String, String)> {
    descendants_named(root, "a").filter_map(href).find_map(|target| {
        paired_groups(&ENCODED_LL, target)
            .or_else(|| paired_groups(&AT_LAT_LNG, target))
            .or_else(|| query_lat_lng(target))
    })
}

fn coords_from_scripts(root: ElementRef<'_>) -> Option<(String, String)> {
    let pairs: [(&Regex, &Regex); 2] = [
        (&*JSON_LATITUDE, &*JSON_LONGITUDE),
        (&*JSON_LAT, &*JSON_LNG),
    ];

    descendants_named(root, "script").find_map(|script| {
        let body = script.text().collect::<String>();
        pairs.iter().find_map(|(lat_re, lng_re)| {
            let lat = first_group(lat_re, &body)?;
            let lng = first_group(lng_re, &body)?;
            Some((lat.to_string(), lng.to_string()))
        })
    })
}

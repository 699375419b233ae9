use regex::Regex;
use std::sync::LazyLock;

pub static HASH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)").expect("hash id regex must compile"));

pub static TICKET_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/tickets/(\d+)").expect("ticket path regex must compile"));

pub static COORD_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((-?\d+\.?\d*),\s*(-?\d+\.?\d*)\)").expect("coordinate pair regex must compile")
});

pub static COORD_LINK_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"lat=|-?\d+\.\d+").expect("coordinate link regex must compile"));

pub static QUERY_LAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"lat=\s*(-?\d+\.?\d*)").expect("lat query regex must compile"));

pub static QUERY_LNG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"lng=\s*(-?\d+\.?\d*)|lon=\s*(-?\d+\.?\d*)").expect("lng query regex must compile")
});

pub static ENCODED_LL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ll=(-?\d+\.?\d*)%2C(-?\d+\.?\d*)").expect("encoded ll regex must compile")
});

pub static AT_LAT_LNG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(-?\d+\.\d+),(-?\d+\.\d+)").expect("at lat,lng regex must compile")
});

pub static JSON_LATITUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""latitude"\s*:\s*([+-]?\d+\.?\d*)"#).expect("json latitude regex must compile")
});

pub static JSON_LONGITUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""longitude"\s*:\s*([+-]?\d+\.?\d*)"#).expect("json longitude regex must compile")
});

pub static JSON_LAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""lat"\s*:\s*([+-]?\d+\.?\d*)"#).expect("json lat regex must compile")
});

pub static JSON_LNG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""lng"\s*:\s*([+-]?\d+\.?\d*)"#).expect("json lng regex must compile")
});

pub static ADDRESS_SHAPES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\d+\s+[A-Za-z0-9\s]+\s+(?:St|Street|Ave|Avenue|Blvd|Boulevard|Rd|Road|Way|Dr|Drive|Ct|Court|Pl|Place|Ln|Lane)\b",
        r"(?i)\d+\s+\d+(?:st|nd|rd|th)\s+(?:St|Street|Ave|Avenue)\b",
        r"(?i)Intersection\s+[A-Za-z0-9\s,]+",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("address regex must compile"))
    .collect()
});

pub static LISTING_DESCRIPTION_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)text-gray-700|description|detail|body|lead")
        .expect("listing description class regex must compile")
});

pub static ANCESTOR_DESCRIPTION_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)text-gray-700").expect("ancestor description class regex must compile")
});

pub static DETAIL_CONTENT_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)desc|description|detail|body|content")
        .expect("detail content class regex must compile")
});

pub static CARD_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ticket|report|card").expect("card class regex must compile")
});

pub fn ticket_digits(value: &str) -> Option<&str> {
    TICKET_PATH
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn first_group<'t>(re: &Regex, haystack: &'t str) -> Option<&'t str> {
    let caps = re.captures(haystack)?;
    caps.iter().skip(1).flatten().next().map(|m| m.as_str())
}

pub fn query_lat_lng(value: &str) -> Option<(String, String)> {
    let lat = first_group(&QUERY_LAT, value)?;
    let lng = first_group(&QUERY_LNG, value)?;
    Some((lat.to_string(), lng.to_string()))
}

pub fn paired_groups(re: &Regex, value: &str) -> Option<(String, String)> {
    let caps = re.captures(value)?;
    let lat = caps.get(1)?.as_str();
    let lng = caps.get(2)?.as_str();
    Some((lat.to_string(), lng.to_string()))
}

pub fn format_coordinates(lat: &str, lng: &str) -> String {
    format!("({lat}, {lng})")
}

pub fn find_address(text: &str) -> Option<String> {
    ADDRESS_SHAPES
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

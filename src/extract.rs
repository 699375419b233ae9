use crate::dom::{
    descendants, descendants_named, descendants_with_class, first_attr, flatten_text, href,
};
use crate::locate::{first_ticket_link, locate_containers};
use crate::model::{ContainerTier, Offense};
use crate::patterns::{
    COORD_LINK_HINT, COORD_PAIR, HASH_ID, LISTING_DESCRIPTION_CLASS, find_address,
    format_coordinates, paired_groups, query_lat_lng, ticket_digits,
};
use scraper::{ElementRef, Html};
use tracing::{debug, info};

pub const LAT_ATTRS: [&str; 2] = ["data-lat", "data-latitude"];
pub const LNG_ATTRS: [&str; 2] = ["data-lng", "data-longitude"];

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "strong", "b"];
const LINKABLE_NODE_ATTRS: [&str; 2] = ["data-linkable-node-url-value", "data-linkable-node-url"];
const MIN_DESCRIPTION_CHARS: usize = 5;
const TYPE_PREFIX_CHARS: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct ParsedListing {
    pub tier: Option<ContainerTier>,
    pub containers_found: usize,
    pub offenses: Vec<Offense>,
}

pub fn parse_html(html: &str) -> ParsedListing {
    let doc = Html::parse_document(html);
    let located = locate_containers(&doc);

    let offenses: Vec<Offense> = located
        .containers
        .iter()
        .map(|container| parse_offense(*container))
        .filter(|offense| !offense.is_empty())
        .collect();

    info!(
        tier = located.tier.map(|t| t.as_str()).unwrap_or("none"),
        containers = located.containers.len(),
        offenses = offenses.len(),
        "parsed listing page"
    );

    ParsedListing {
        tier: located.tier,
        containers_found: located.containers.len(),
        offenses,
    }
}

pub fn parse_offense(container: ElementRef<'_>) -> Offense {
    let text = flatten_text(container);

    let offense_id = extract_offense_id(container, &text);
    let coordinates = extract_coordinates(container, &text);
    let address = find_address(&text);
    let offense_type = extract_offense_type(container);
    let description =
        extract_description(container, address.as_deref(), offense_type.as_deref());

    let offense = Offense {
        offense_type,
        address,
        coordinates,
        description,
        offense_id,
    };
    debug!(?offense, "parsed container");
    offense
}

pub fn extract_offense_id(container: ElementRef<'_>, text: &str) -> Option<String> {
    let digits = HASH_ID
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .or_else(|| first_ticket_link(container).and_then(ticket_digits))
        .or_else(|| {
            LINKABLE_NODE_ATTRS
                .into_iter()
                .filter_map(|name| container.value().attr(name))
                .find_map(ticket_digits)
        })?;

    Some(format!("#{digits}"))
}

pub fn extract_coordinates(container: ElementRef<'_>, text: &str) -> Option<String> {
    if let Some((lat, lng)) = paired_groups(&COORD_PAIR, text) {
        return Some(format_coordinates(&lat, &lng));
    }

    if let Some((lat, lng)) = gather_lat_lng(container) {
        return Some(format_coordinates(lat, lng));
    }

    let link = descendants_named(container, "a")
        .filter_map(href)
        .find(|target| COORD_LINK_HINT.is_match(target))?;
    let (lat, lng) = query_lat_lng(link)?;
    Some(format_coordinates(&lat, &lng))
}

fn gather_lat_lng(container: ElementRef<'_>) -> Option<(&str, &str)> {
    let mut lat = None;
    let mut lng = None;
    for el in std::iter::once(container).chain(descendants(container)) {
        lat = lat.or_else(|| first_attr(el, &LAT_ATTRS));
        lng = lng.or_else(|| first_attr(el, &LNG_ATTRS));
        if let (Some(lat), Some(lng)) = (lat, lng) {
            return Some((lat, lng));
        }
    }
    None
}

pub fn attr_lat_lng(el: ElementRef<'_>) -> Option<(&str, &str)> {
    let lat = first_attr(el, &LAT_ATTRS)?;
    let lng = first_attr(el, &LNG_ATTRS)?;
    Some((lat, lng))
}

pub fn extract_offense_type(container: ElementRef<'_>) -> Option<String> {
    HEADING_TAGS.into_iter().find_map(|tag| {
        let heading = descendants_named(container, tag).next()?;
        let label = flatten_text(heading);
        let chars = label.chars().count();
        (chars > 5 && chars < 100 && !label.starts_with('#')).then_some(label)
    })
}

pub fn extract_description(
    container: ElementRef<'_>,
    address: Option<&str>,
    offense_type: Option<&str>,
) -> Option<String> {
    let type_prefix: Option<String> =
        offense_type.map(|label| label.chars().take(TYPE_PREFIX_CHARS).collect());

    let preferred = descendants_with_class(container, "p", &LISTING_DESCRIPTION_CLASS)
        .next()
        .map(flatten_text)
        .filter(|text| !text.is_empty());

    let description = preferred.or_else(|| {
        let paragraphs: Vec<_> = descendants_named(container, "p").collect();
        paragraphs.into_iter().rev().map(flatten_text).find(|text| {
            !text.is_empty()
                && address.is_none_or(|addr| text != addr)
                && type_prefix
                    .as_deref()
                    .is_none_or(|prefix| !text.starts_with(prefix))
        })
    })?;

    if address.is_some_and(|addr| description.trim() == addr.trim()) {
        return None;
    }
    if description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
        return None;
    }
    Some(description)
}

use crate::dom::{class_matches, descendants, descendants_named, has_class_tokens, href, is_named};
use crate::model::ContainerTier;
use crate::patterns::{ANCESTOR_DESCRIPTION_CLASS, CARD_CLASS, TICKET_PATH, ticket_digits};
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use tracing::debug;

const CARD_TAGS: [&str; 3] = ["article", "div", "li"];
const MAX_ANCESTOR_LEVELS: usize = 6;

#[derive(Debug, Clone)]
pub struct Located<'a> {
    pub tier: Option<ContainerTier>,
    pub containers: Vec<ElementRef<'a>>,
}

pub fn locate_containers(doc: &Html) -> Located<'_> {
    let root = doc.root_element();

    let tiers: [(ContainerTier, fn(ElementRef<'_>) -> Vec<ElementRef<'_>>); 3] = [
        (ContainerTier::ClassSignature, by_class_signature),
        (ContainerTier::ClassKeyword, by_class_keyword),
        (ContainerTier::LinkAncestor, by_link_ancestor),
    ];

    for (tier, locate) in tiers {
        let containers = locate(root);
        if !containers.is_empty() {
            debug!(tier = tier.as_str(), containers = containers.len(), "container tier matched");
            return Located {
                tier: Some(tier),
                containers,
            };
        }
    }

    debug!("no ticket containers found");
    Located {
        tier: None,
        containers: Vec::new(),
    }
}

pub fn by_class_signature(root: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for candidate in descendants(root).filter(|el| has_class_tokens(*el, &["flex", "items-center"]))
    {
        let Some(key) = first_ticket_link(candidate).and_then(ticket_digits) else {
            continue;
        };
        if seen.insert(key.to_string()) {
            out.push(candidate);
        }
    }

    out
}

pub fn by_class_keyword(root: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    for tag in CARD_TAGS {
        let found: Vec<_> = descendants_named(root, tag)
            .filter(|el| class_matches(*el, &CARD_CLASS))
            .collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

pub fn by_link_ancestor(root: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    let links = descendants_named(root, "a")
        .filter(|a| href(*a).is_some_and(|target| TICKET_PATH.is_match(target)));

    for link in links {
        let Some(container) = description_ancestor(link) else {
            continue;
        };
        if seen.insert(container.id()) {
            out.push(container);
        }
    }

    out
}

fn description_ancestor(link: ElementRef<'_>) -> Option<ElementRef<'_>> {
    link.ancestors()
        .filter_map(ElementRef::wrap)
        .take(MAX_ANCESTOR_LEVELS)
        .take_while(|parent| !is_named(*parent, &["body", "html"]))
        .find(|parent| {
            descendants_named(*parent, "p").any(|p| class_matches(p, &ANCESTOR_DESCRIPTION_CLASS))
        })
}

pub fn first_ticket_link(el: ElementRef<'_>) -> Option<&str> {
    descendants_named(el, "a")
        .filter_map(href)
        .find(|target| TICKET_PATH.is_match(target))
}

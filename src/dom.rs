use regex::Regex;
use scraper::ElementRef;

pub fn descendants<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.descendants().skip(1).filter_map(ElementRef::wrap)
}

pub fn descendants_named<'a>(
    el: ElementRef<'a>,
    name: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> {
    descendants(el).filter(move |child| child.value().name().eq_ignore_ascii_case(name))
}

pub fn descendants_with_class<'a>(
    el: ElementRef<'a>,
    name: &'a str,
    class_re: &'a Regex,
) -> impl Iterator<Item = ElementRef<'a>> {
    descendants_named(el, name).filter(move |child| class_matches(*child, class_re))
}

pub fn class_matches(el: ElementRef<'_>, class_re: &Regex) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|class| class_re.is_match(class))
}

pub fn has_class_tokens(el: ElementRef<'_>, tokens: &[&str]) -> bool {
    tokens
        .iter()
        .all(|token| el.value().classes().any(|class| class == *token))
}

pub fn flatten_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn first_attr<'a>(el: ElementRef<'a>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| el.value().attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

pub fn href<'a>(el: ElementRef<'a>) -> Option<&'a str> {
    el.value().attr("href").filter(|v| !v.is_empty())
}

pub fn is_named(el: ElementRef<'_>, names: &[&str]) -> bool {
    names
        .iter()
        .any(|name| el.value().name().eq_ignore_ascii_case(name))
}

//! HTML extraction for listing index pages.
//!
//! The listing site renders results as a fixed structure of
//! `article.listing` cards with one span per field. Parsing is pure
//! (string in, records out) so it can be exercised offline against captured
//! fixture pages. Fields that are absent or unparseable come back as `None`
//! and are left to the cleaner.

use crate::record::RawListing;
use scraper::{ElementRef, Html, Selector};

const CARD: &str = "article.listing";
const LOCATION: &str = ".listing-location";
const PROPERTY_TYPE: &str = ".listing-type";
const BEDROOMS: &str = ".listing-beds";
const BATHROOMS: &str = ".listing-baths";
const RECEPTIONS: &str = ".listing-receptions";
const FLOOR_AREA: &str = ".listing-area";
const PRICE: &str = ".listing-price";

/// Extract every listing card from one index page.
pub fn parse_listing_page(html: &str) -> Vec<RawListing> {
    let document = Html::parse_document(html);
    let card = selector(CARD);
    let location = selector(LOCATION);
    let property_type = selector(PROPERTY_TYPE);
    let bedrooms = selector(BEDROOMS);
    let bathrooms = selector(BATHROOMS);
    let receptions = selector(RECEPTIONS);
    let floor_area = selector(FLOOR_AREA);
    let price = selector(PRICE);

    document
        .select(&card)
        .map(|el| RawListing {
            location: text_of(&el, &location),
            property_type: text_of(&el, &property_type).map(|s| s.to_lowercase()),
            bedrooms: text_of(&el, &bedrooms).as_deref().and_then(parse_count),
            bathrooms: text_of(&el, &bathrooms).as_deref().and_then(parse_count),
            receptions: text_of(&el, &receptions).as_deref().and_then(parse_count),
            floor_area: text_of(&el, &floor_area).as_deref().and_then(parse_number),
            price: text_of(&el, &price).as_deref().and_then(parse_price),
        })
        .collect()
}

/// Normalise a displayed price like `£1,250,000` or `Offers over £450,000`
/// to a positive numeric value. Non-numeric prices (`POA`) yield `None`.
pub fn parse_price(text: &str) -> Option<f64> {
    parse_number(text).filter(|p| *p > 0.0)
}

/// First integer in a label like `3 bedrooms`.
pub fn parse_count(text: &str) -> Option<u32> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}

/// First numeric run in the text, with thousands separators stripped
/// (`1,076.5 sq m` parses to `1076.5`).
pub fn parse_number(text: &str) -> Option<f64> {
    let mut run = String::new();
    let mut started = false;
    for c in text.chars() {
        match c {
            '0'..='9' | '.' => {
                started = true;
                run.push(c);
            }
            ',' if started => {}
            _ if started => break,
            _ => {}
        }
    }
    run.parse().ok()
}

fn text_of(card: &ElementRef<'_>, field: &Selector) -> Option<String> {
    card.select(field)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <html><body>
        <article class="listing">
            <span class="listing-location">SW1</span>
            <span class="listing-type">Flat</span>
            <span class="listing-beds">2 bedrooms</span>
            <span class="listing-baths">1 bathroom</span>
            <span class="listing-receptions">1 reception</span>
            <span class="listing-area">58 sq m</span>
            <span class="listing-price">&pound;425,000</span>
        </article>
        <article class="listing">
            <span class="listing-location">N1</span>
            <span class="listing-type">Detached</span>
            <span class="listing-beds">4 bedrooms</span>
            <span class="listing-area">1,076.5 sq m</span>
            <span class="listing-price">Offers over &pound;950,000</span>
        </article>
        <article class="listing">
            <span class="listing-type">Bungalow</span>
            <span class="listing-price">POA</span>
        </article>
        </body></html>
    "#;

    #[test]
    fn test_parse_fixture_page() {
        let listings = parse_listing_page(FIXTURE);
        assert_eq!(listings.len(), 3);

        let first = &listings[0];
        assert_eq!(first.location.as_deref(), Some("SW1"));
        assert_eq!(first.property_type.as_deref(), Some("flat"));
        assert_eq!(first.bedrooms, Some(2));
        assert_eq!(first.bathrooms, Some(1));
        assert_eq!(first.receptions, Some(1));
        assert_eq!(first.floor_area, Some(58.0));
        assert_eq!(first.price, Some(425_000.0));
    }

    #[test]
    fn test_parse_partial_card_leaves_missing_fields() {
        let listings = parse_listing_page(FIXTURE);
        let second = &listings[1];
        assert_eq!(second.bathrooms, None);
        assert_eq!(second.receptions, None);
        assert_eq!(second.floor_area, Some(1_076.5));
        assert_eq!(second.price, Some(950_000.0));
    }

    #[test]
    fn test_parse_poa_price_is_missing() {
        let listings = parse_listing_page(FIXTURE);
        assert_eq!(listings[2].price, None);
        assert_eq!(listings[2].location, None);
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_listing_page("<html><body></body></html>").is_empty());
    }

    #[test]
    fn test_parse_price_variants() {
        assert_eq!(parse_price("£350,000"), Some(350_000.0));
        assert_eq!(parse_price("Guide price £1,250,000"), Some(1_250_000.0));
        assert_eq!(parse_price("POA"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("£0"), None);
    }

    #[test]
    fn test_parse_count_variants() {
        assert_eq!(parse_count("3 bedrooms"), Some(3));
        assert_eq!(parse_count("bedrooms: 12"), Some(12));
        assert_eq!(parse_count("studio"), None);
    }

    #[test]
    fn test_parse_number_stops_at_first_run() {
        assert_eq!(parse_number("58 sq m (624 sq ft)"), Some(58.0));
        assert_eq!(parse_number("1,076.5 sq m"), Some(1_076.5));
        assert_eq!(parse_number("no area"), None);
    }
}

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::Listing;

const CONTAINER: &str = ".cards-container";
const CARD: &str = ".card";
const TITLE: &str = ".card-title";
const AREA_TAG: &str = ".area-tag";
const PRICE: &str = ".card-price";
const FEATURE_TAG: &str = ".feature-tag";
const BADGE: &str = ".card-badge";

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::MalformedData(format!("invalid selector {css}: {e:?}")))
}

fn first_text(card: &ElementRef<'_>, selector: &Selector) -> String {
    card.select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn attr(card: &ElementRef<'_>, name: &str) -> String {
    card.value().attr(name).unwrap_or("").trim().to_string()
}

/// Parse a rupee amount such as "₹6,500/month"
pub fn parse_price(text: &str) -> Option<u32> {
    let (_, after) = text.split_once('₹')?;
    let digits: String = after
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Parse the listing cards of a PG finder page in author order
pub fn parse_listings(html: &str) -> Result<Vec<Listing>> {
    let document = Html::parse_document(html);

    let container_selector = selector(CONTAINER)?;
    let card_selector = selector(CARD)?;
    let title_selector = selector(TITLE)?;
    let area_selector = selector(AREA_TAG)?;
    let price_selector = selector(PRICE)?;
    let feature_selector = selector(FEATURE_TAG)?;
    let badge_selector = selector(BADGE)?;

    let container = document
        .select(&container_selector)
        .next()
        .ok_or_else(|| Error::ElementNotFound(CONTAINER.to_string()))?;

    let mut listings = Vec::new();

    for card in container.select(&card_selector) {
        let features: Vec<String> = card
            .select(&feature_selector)
            .map(|tag| tag.text().collect::<String>().trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();

        let price_text = first_text(&card, &price_selector);

        let listing = Listing {
            title: first_text(&card, &title_selector),
            area: first_text(&card, &area_selector),
            room_type: attr(&card, "data-type"),
            price_range: attr(&card, "data-price"),
            area_slug: attr(&card, "data-area"),
            price: parse_price(&price_text),
            features,
            badge: first_text(&card, &badge_selector),
        };

        debug!("Parsed listing: {}", listing.identity());
        listings.push(listing);
    }

    info!("Found {} listing cards", listings.len());

    Ok(listings)
}

//! Fantasy game page extractor

use super::{select_text, selector, strip_currency};
use crate::Result;
use scraper::Html;
use std::collections::BTreeMap;

/// Player name → price in thousands. Cards without a readable price are skipped.
pub fn extract_prices(html: &str) -> Result<BTreeMap<String, u32>> {
    let document = Html::parse_document(html);
    let card_selector = selector("div.teamPlayer")?;
    let name_selector = selector("div.player-card-container")?;
    let price_selector = selector("div.playerButtonText")?;

    let mut prices = BTreeMap::new();
    for card in document.select(&card_selector) {
        let name = select_text(&card, &name_selector).map(|n| n.to_lowercase());
        let price = select_text(&card, &price_selector)
            .and_then(|p| strip_currency(&p))
            .and_then(|p| p.parse::<f64>().ok());
        match (name, price) {
            (Some(name), Some(price)) => {
                prices.insert(name, (price / 1000.0).round() as u32);
            }
            (name, _) => log::warn!("Skipping fantasy card {:?} without price", name),
        }
    }
    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prices() {
        let html = r#"
            <div class="teamPlayer"><div class="player-card-container">ZywOo</div>
              <div class="playerButtonText">$235,000</div></div>
            <div class="teamPlayer"><div class="player-card-container">apEX</div>
              <div class="playerButtonText">$160,000</div></div>
            <div class="teamPlayer"><div class="player-card-container">ghost</div></div>"#;
        let prices = extract_prices(html).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices["zywoo"], 235);
        assert_eq!(prices["apex"], 160);
    }
}

//! Payload extraction
//!
//! Stateless functions turning provider payloads into typed records. Records
//! missing a required field (rank, name, symbol, price) are dropped here, so
//! nothing downstream ever sees a partial [`ListingRecord`].

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::fetcher::endpoints::DocumentSelectors;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::{ListingRecord, PriceQuote};

/// Stand-in market cap factor for document listings, which carry no real
/// market cap column. Values derived from it are estimates only.
pub const PLACEHOLDER_MARKET_CAP_MULTIPLIER: f64 = 1_000_000.0;

/// Stateless extractor for provider payloads
pub struct PayloadExtractor;

impl PayloadExtractor {
    /// Extract `{asset_id: {usd, last_updated_at}}` from a simple-price payload
    ///
    /// # Errors
    /// `MissingField` when the asset or its USD price is absent
    pub fn price_quote(payload: &Value, asset_id: &str) -> FetcherResult<PriceQuote> {
        let entry = payload.get(asset_id);
        let price = entry
            .and_then(|e| e.get("usd"))
            .and_then(Value::as_f64)
            .ok_or_else(|| FetcherError::MissingField(format!("{asset_id}.usd")))?;
        let last_updated = entry
            .and_then(|e| e.get("last_updated_at"))
            .and_then(Value::as_i64);

        Ok(PriceQuote {
            symbol: asset_id.to_string(),
            price,
            last_updated,
        })
    }

    /// Extract every well-formed entry of `data.cryptoCurrencyList`
    ///
    /// A payload without the list yields no records rather than an error.
    pub fn listings_from_json(payload: &Value) -> Vec<ListingRecord> {
        let Some(items) = payload
            .pointer("/data/cryptoCurrencyList")
            .and_then(Value::as_array)
        else {
            debug!("Payload has no data.cryptoCurrencyList");
            return Vec::new();
        };

        let records: Vec<ListingRecord> =
            items.iter().filter_map(Self::listing_from_json_item).collect();

        if records.len() < items.len() {
            debug!(
                dropped = items.len() - records.len(),
                kept = records.len(),
                "Dropped malformed listing entries"
            );
        }
        records
    }

    /// Extract one listing entry; `None` if a required field is missing
    pub fn listing_from_json_item(item: &Value) -> Option<ListingRecord> {
        let rank = item
            .get("cmcRank")
            .and_then(Value::as_u64)
            .and_then(|r| u32::try_from(r).ok())?;
        let name = item.get("name").and_then(Value::as_str)?;
        let symbol = item.get("symbol").and_then(Value::as_str)?;
        let price = item.pointer("/quotes/0/price").and_then(Value::as_f64)?;
        let change_24h = item
            .pointer("/quotes/0/percentChange24h")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let market_cap = item
            .pointer("/quotes/0/marketCap")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let record = ListingRecord {
            rank,
            name: name.to_string(),
            symbol: symbol.to_string(),
            price,
            change_24h,
            market_cap,
        };
        record.validate().ok().map(|_| record)
    }

    /// Extract listings from a rendered ranking page
    ///
    /// # Errors
    /// `Parse` only when a configured selector is not valid CSS; malformed
    /// rows are skipped
    pub fn listings_from_document(
        html: &str,
        selectors: &DocumentSelectors,
    ) -> FetcherResult<Vec<ListingRecord>> {
        let row = parse_selector(&selectors.row)?;
        let rank = parse_selector(&selectors.rank)?;
        let name = parse_selector(&selectors.name)?;
        let symbol = parse_selector(&selectors.symbol)?;
        let price = parse_selector(&selectors.price)?;
        let change = parse_selector(&selectors.change)?;

        let document = Html::parse_document(html);
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for element in document.select(&row) {
            let record = (|| {
                let rank = first_text(&element, &rank)
                    .and_then(|t| digits(&t).parse::<u32>().ok())?;
                let name = first_text(&element, &name)?;
                let symbol = first_text(&element, &symbol)?;
                let price = first_text(&element, &price).and_then(|t| parse_number(&t, false))?;
                let change_24h = element
                    .select(&change)
                    .map(element_text)
                    .find(|t| t.contains('%'))
                    .and_then(|t| parse_number(&t, true))
                    .unwrap_or(0.0);

                let record = ListingRecord {
                    rank,
                    name,
                    symbol,
                    price,
                    change_24h,
                    market_cap: price * PLACEHOLDER_MARKET_CAP_MULTIPLIER,
                };
                record.validate().ok().map(|_| record)
            })();

            match record {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(skipped, kept = records.len(), "Skipped malformed document rows");
        }
        Ok(records)
    }
}

fn parse_selector(css: &str) -> FetcherResult<Selector> {
    Selector::parse(css).map_err(|e| FetcherError::Parse(format!("invalid selector '{css}': {e}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the first match, `None` if absent or blank
fn first_text(scope: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

fn digits(text: &str) -> String {
    text.chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect()
}

/// Parse a display number such as `$43,210.50` or `-1.25%`
fn parse_number(text: &str, signed: bool) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || (signed && *c == '-'))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

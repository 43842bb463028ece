//! Provider endpoint configuration
//!
//! URL layout and document selectors for each provider, kept as data so the
//! providers themselves only wire fetching to extraction.

/// Default CoinGecko API root
pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Default CoinMarketCap site root (document mode)
pub const COINMARKETCAP_BASE_URL: &str = "https://coinmarketcap.com";

/// Default CoinMarketCap listing API (JSON mode)
pub const COINMARKETCAP_API_URL: &str =
    "https://api.coinmarketcap.com/data-api/v3/cryptocurrency/listing";

/// Strip one trailing slash so joined paths never contain `//`
fn trim_base(base: &str) -> &str {
    base.strip_suffix('/').unwrap_or(base)
}

/// CoinGecko simple-price URL for `asset_id`
pub fn coingecko_price_url(base_url: &str, asset_id: &str) -> String {
    format!(
        "{}/simple/price?ids={asset_id}&vs_currencies=usd&include_last_updated_at=true",
        trim_base(base_url)
    )
}

/// CoinMarketCap listing API URL for a 1-based page
pub fn coinmarketcap_listing_url(api_url: &str, page: u32, per_page: u32) -> String {
    let start = page.saturating_sub(1).saturating_mul(per_page).saturating_add(1);
    format!(
        "{api_url}?start={start}&limit={per_page}&sortBy=market_cap&sortType=desc&convert=USD"
    )
}

/// CoinMarketCap ranking page URL for a 1-based page
pub fn coinmarketcap_document_url(base_url: &str, page: u32) -> String {
    let base = trim_base(base_url);
    if page > 1 {
        format!("{base}/page/{page}/")
    } else {
        format!("{base}/")
    }
}

/// CSS selectors locating listing fields inside a ranking table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSelectors {
    /// One table row per asset
    pub row: String,
    /// Cell holding the rank number
    pub rank: String,
    /// Asset name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Price cell
    pub price: String,
    /// Element holding the 24h change (text contains `%`)
    pub change: String,
}

impl Default for DocumentSelectors {
    fn default() -> Self {
        Self {
            row: "tr.cmc-table-row".to_string(),
            rank: "td".to_string(),
            name: "p.sc-4984dd93-0".to_string(),
            symbol: "p.coin-item-symbol".to_string(),
            price: "div.sc-b3fc6b7-0".to_string(),
            change: "span".to_string(),
        }
    }
}

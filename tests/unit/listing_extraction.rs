use crypto_crawler::fetcher::extract::PayloadExtractor;
use serde_json::json;

#[test]
fn extracts_well_formed_entries_in_order() {
    let payload = json!({"data": {"cryptoCurrencyList": [
        {"cmcRank": 1, "name": "Bitcoin", "symbol": "BTC",
         "quotes": [{"price": 43000.0, "percentChange24h": 1.5, "marketCap": 8.4e11}]},
        {"cmcRank": 2, "name": "Ethereum", "symbol": "ETH",
         "quotes": [{"price": 2300, "percentChange24h": -0.7, "marketCap": 2.7e11}]}
    ]}});

    let records = PayloadExtractor::listings_from_json(&payload);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].rank, 1);
    assert_eq!(records[0].market_cap, 8.4e11);
    assert_eq!(records[1].price, 2300.0);
    assert_eq!(records[1].change_24h, -0.7);
}

#[test]
fn drops_entries_missing_required_fields() {
    let payload = json!({"data": {"cryptoCurrencyList": [
        {"name": "No Rank", "symbol": "NR", "quotes": [{"price": 1.0}]},
        {"cmcRank": 2, "symbol": "NN", "quotes": [{"price": 1.0}]},
        {"cmcRank": 3, "name": "No Symbol", "quotes": [{"price": 1.0}]},
        {"cmcRank": 4, "name": "No Quote", "symbol": "NQ", "quotes": []},
        {"cmcRank": 5, "name": "Text Price", "symbol": "TP", "quotes": [{"price": "1.0"}]},
        {"cmcRank": 0, "name": "Zero Rank", "symbol": "ZR", "quotes": [{"price": 1.0}]},
        {"cmcRank": 7, "name": "Kept", "symbol": "OK", "quotes": [{"price": 1.0}]}
    ]}});

    let records = PayloadExtractor::listings_from_json(&payload);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].symbol, "OK");
}

#[test]
fn defaults_optional_fields_to_zero() {
    let item = json!({"cmcRank": 9, "name": "Quiet", "symbol": "QT",
                      "quotes": [{"price": 3.0, "percentChange24h": null}]});

    let record = PayloadExtractor::listing_from_json_item(&item).unwrap();

    assert_eq!(record.change_24h, 0.0);
    assert_eq!(record.market_cap, 0.0);
}

#[test]
fn missing_list_yields_no_records() {
    assert!(PayloadExtractor::listings_from_json(&json!({"status": "error"})).is_empty());
    assert!(PayloadExtractor::listings_from_json(&json!({"data": {"cryptoCurrencyList": {}}})).is_empty());
}

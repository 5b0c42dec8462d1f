use crate::models::market::{Market, MarketCategory};

const END_OF_2026: &str = "2026-12-31T00:00:00Z";

/// Built-in market catalog used when no explicit one is supplied.
pub fn default_markets() -> Vec<Market> {
    [
        ("mkt_btc_150k", "Will Bitcoin reach $150k by end of 2026?", MarketCategory::Crypto, 0.42, 2_400_000.0),
        ("mkt_us_election", "Will the current party win the next US election?", MarketCategory::Politics, 0.55, 4_100_000.0),
        ("mkt_eth_10k", "Will Ethereum surpass $10k in 2026?", MarketCategory::Crypto, 0.31, 1_300_000.0),
        ("mkt_mars", "Will humans land on Mars before 2030?", MarketCategory::Science, 0.08, 350_000.0),
        ("mkt_fed_rate", "Will FED rate drop below 2% in 2026?", MarketCategory::Politics, 0.38, 2_900_000.0),
        ("mkt_gpt6", "Will GPT-6 be released before 2027?", MarketCategory::Science, 0.65, 1_800_000.0),
        ("mkt_ballon_dor", "Will Mbappé win the 2026 Ballon d'Or?", MarketCategory::Sports, 0.15, 620_000.0),
        ("mkt_box_office", "Will a 2026 release gross over $2B worldwide?", MarketCategory::Entertainment, 0.22, 410_000.0),
    ]
    .into_iter()
    .map(|(id, question, category, price, volume)| {
        let mut market = Market::new(id, question, category, price);
        market.volume_24h = volume;
        market.liquidity = volume * 2.5;
        market.end_date = END_OF_2026.to_string();
        market
    })
    .collect()
}

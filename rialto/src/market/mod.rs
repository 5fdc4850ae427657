//! Randomized demo market feed. Quotes random-walk on every refresh, the board
//! never calls out to a real data source.
use rand::thread_rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuote {
    pub symbol: String,
    pub price: f64,
    pub change_pct: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Default)]
pub struct MarketBoard {
    quotes: Vec<MarketQuote>,
}

impl MarketBoard {
    pub fn random(symbols: Vec<&str>) -> Self {
        let price_dist = Uniform::new(90.0, 100.0);
        let mut rng = thread_rng();
        let now = OffsetDateTime::now_utc();

        let quotes = symbols
            .iter()
            .map(|symbol| MarketQuote {
                symbol: symbol.to_string(),
                price: price_dist.sample(&mut rng),
                change_pct: 0.0,
                updated_at: now,
            })
            .collect();
        Self { quotes }
    }

    /// Walks every quote by a small normally-distributed percentage step.
    pub fn refresh(&mut self) {
        let step_dist = Normal::new(0.0, 0.5).unwrap();
        let mut rng = thread_rng();
        let now = OffsetDateTime::now_utc();

        for quote in self.quotes.iter_mut() {
            let step_pct: f64 = step_dist.sample(&mut rng);
            quote.price *= 1.0 + (step_pct / 100.0);
            quote.change_pct = step_pct;
            quote.updated_at = now;
        }
    }

    pub fn quotes(&self) -> Vec<MarketQuote> {
        self.quotes.clone()
    }
}

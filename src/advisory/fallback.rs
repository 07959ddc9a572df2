//! Fixed content returned whenever the generative endpoint cannot answer.

use super::market::{MarketSnapshot, TopTraded};

pub const ADVICE_NOT_CONFIGURED: &str =
    "No valid API key was detected. Set API_KEY in the environment to enable financial advice.";

pub const ADVICE_UNAVAILABLE: &str =
    "Could not reach the AI service. Check your network connection and API key, then try again.";

pub const ADVICE_EMPTY: &str = "The AI could not generate advice right now. Please try again later.";

pub const INSPIRATION_FALLBACKS: [&str; 5] = [
    "Small savings today build big freedom tomorrow.",
    "Every budgeted dollar is a decision you made on purpose.",
    "Wealth grows quietly from habits repeated daily.",
    "Pay yourself first, then spend what remains.",
    "A clear plan turns money worries into money goals.",
];

/// Placeholder market data with three top-traded entries and no sources.
pub fn fallback_market_snapshot() -> MarketSnapshot {
    MarketSnapshot {
        top_traded: vec![
            TopTraded {
                name: "TSMC".into(),
                volume: "52,000 lots".into(),
                change: "+1.2%".into(),
            },
            TopTraded {
                name: "Hon Hai".into(),
                volume: "48,500 lots".into(),
                change: "-0.5%".into(),
            },
            TopTraded {
                name: "MediaTek".into(),
                volume: "12,300 lots".into(),
                change: "+2.1%".into(),
            },
        ],
        hot_sectors: vec![
            "Semiconductors".into(),
            "AI servers".into(),
            "Shipping".into(),
        ],
        summary: "Market data is unavailable right now; showing sample figures.".into(),
        sources: Vec::new(),
    }
}

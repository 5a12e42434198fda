//! Latest official draw, fetched with a primary → secondary → mock fallback chain.

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::numbers::{is_valid_multiplier, NumberSet, WHITE_BALL_COUNT};
use crate::config::GatewayConfig;
use crate::log;

/// Where a draw came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawSource {
    Primary,
    Secondary,
    Mock,
}

/// One official draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    /// Draw date as YYYY-MM-DD
    pub draw_date: String,
    pub winning_numbers: NumberSet,
    /// Power Play multiplier drawn alongside the numbers
    pub multiplier: Option<u8>,
    /// Advertised jackpot in dollars (0 when unknown)
    pub jackpot_amount: u64,
    pub source: DrawSource,
}

impl Draw {
    /// Stand-in draw used when no remote source answers.
    pub fn mock() -> Self {
        Self {
            draw_date: Local::now().format("%Y-%m-%d").to_string(),
            winning_numbers: NumberSet {
                white_balls: [12, 23, 34, 45, 56],
                powerball: 7,
                power_play: None,
            },
            multiplier: Some(3),
            jackpot_amount: 50_000_000,
            source: DrawSource::Mock,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.source == DrawSource::Mock
    }
}

/// Source of JSON documents. Lets the fallback chain run without a network.
pub trait JsonFetcher {
    fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value>;
}

/// Blocking HTTP fetcher.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl JsonFetcher for HttpFetcher {
    fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .header("User-Agent", "powerball-scan")
            .send()
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("{} returned HTTP {}", url, response.status()));
        }

        response
            .json::<Value>()
            .with_context(|| format!("Invalid JSON from {}", url))
    }
}

/// Resolves the latest draw from the configured sources.
pub struct DrawGateway<F: JsonFetcher> {
    fetcher: F,
    primary_url: String,
    secondary_url: String,
}

impl DrawGateway<HttpFetcher> {
    /// Gateway backed by real HTTP requests.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(fetcher, config))
    }
}

impl<F: JsonFetcher> DrawGateway<F> {
    pub fn new(fetcher: F, config: &GatewayConfig) -> Self {
        Self {
            fetcher,
            primary_url: config.primary_url.clone(),
            secondary_url: config.secondary_url.clone(),
        }
    }

    /// Returns the latest draw. Never fails: falls back to mock data when both
    /// remote sources fail.
    pub fn latest_draw(&self) -> Draw {
        match self.fetch_primary() {
            Ok(draw) => return draw,
            Err(e) => log(&format!("Primary draw source failed: {:#}", e)),
        }

        match self.fetch_secondary() {
            Ok(draw) => return draw,
            Err(e) => log(&format!("Secondary draw source failed: {:#}", e)),
        }

        log("Warning: all draw sources failed, using mock draw data");
        Draw::mock()
    }

    fn fetch_primary(&self) -> Result<Draw> {
        let data = self.fetcher.get_json(&self.primary_url, &[])?;
        parse_results_feed(&data)
    }

    fn fetch_secondary(&self) -> Result<Draw> {
        let data = self.fetcher.get_json(
            &self.secondary_url,
            &[("$order", "draw_date DESC"), ("$limit", "1")],
        )?;
        let latest = data
            .as_array()
            .and_then(|rows| rows.first())
            .ok_or_else(|| anyhow!("No rows in secondary draw response"))?;
        parse_open_data_row(latest)
    }
}

/// Parses a lottery results feed: a list of games, one of which is Powerball.
pub fn parse_results_feed(data: &Value) -> Result<Draw> {
    let games = data
        .as_array()
        .ok_or_else(|| anyhow!("Results feed is not a list"))?;

    let entry = games
        .iter()
        .find(|game| {
            ["name", "game"].iter().any(|key| {
                game.get(key)
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.to_lowercase().contains("powerball"))
            })
        })
        .ok_or_else(|| anyhow!("Powerball not found in results feed"))?;

    let numbers = ["winning_numbers", "numbers", "results"]
        .iter()
        .find_map(|key| entry.get(key))
        .ok_or_else(|| anyhow!("No winning numbers in Powerball entry"))?;

    let (white_balls, powerball) = if let Some(all) = numbers.as_array() {
        // Flat list, powerball last
        let values = number_list(all)?;
        if values.len() < WHITE_BALL_COUNT + 1 {
            return Err(anyhow!("Expected 6 winning numbers, got {}", values.len()));
        }
        (values[..WHITE_BALL_COUNT].to_vec(), values[WHITE_BALL_COUNT])
    } else if let (Some(whites), Some(pb)) = (numbers.get("white_balls"), numbers.get("powerball")) {
        (number_list(array_of(whites)?)?, number_of(pb)?)
    } else if let (Some(whites), Some(pb)) = (numbers.get("main"), numbers.get("bonus")) {
        (number_list(array_of(whites)?)?, number_of(pb)?)
    } else {
        return Err(anyhow!("Unrecognized winning number format: {}", numbers));
    };

    let winning_numbers = build_winning_numbers(&white_balls, powerball)?;
    let draw_date = ["draw_date", "date"]
        .iter()
        .find_map(|key| entry.get(key).and_then(Value::as_str))
        .map(normalize_date)
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());
    let multiplier = ["power_play", "multiplier"]
        .iter()
        .find_map(|key| entry.get(key))
        .and_then(|v| number_of(v).ok())
        .filter(|&m| is_valid_multiplier(m));
    let jackpot_amount = ["jackpot", "jackpot_amount"]
        .iter()
        .find_map(|key| entry.get(key))
        .and_then(amount_of)
        .unwrap_or(0);

    Ok(Draw {
        draw_date,
        winning_numbers,
        multiplier,
        jackpot_amount,
        source: DrawSource::Primary,
    })
}

/// Parses one row of the NY State open data Powerball dataset.
pub fn parse_open_data_row(row: &Value) -> Result<Draw> {
    let text = row
        .get("winning_numbers")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Row has no winning_numbers"))?;

    let values = text
        .split_whitespace()
        .map(|n| n.parse::<u8>().with_context(|| format!("Bad number '{}'", n)))
        .collect::<Result<Vec<u8>>>()?;
    if values.len() < WHITE_BALL_COUNT + 1 {
        return Err(anyhow!("Expected 6 winning numbers, got '{}'", text));
    }
    let winning_numbers =
        build_winning_numbers(&values[..WHITE_BALL_COUNT], values[WHITE_BALL_COUNT])?;

    let draw_date = row
        .get("draw_date")
        .and_then(Value::as_str)
        .map(normalize_date)
        .ok_or_else(|| anyhow!("Row has no draw_date"))?;
    let multiplier = ["multiplier", "power_play_multiplier"]
        .iter()
        .find_map(|key| row.get(key))
        .and_then(|v| number_of(v).ok())
        .filter(|&m| is_valid_multiplier(m));
    let jackpot_amount = row.get("jackpot_amount").and_then(amount_of).unwrap_or(0);

    Ok(Draw {
        draw_date,
        winning_numbers,
        multiplier,
        jackpot_amount,
        source: DrawSource::Secondary,
    })
}

fn build_winning_numbers(white_balls: &[u8], powerball: u8) -> Result<NumberSet> {
    let white_balls: [u8; WHITE_BALL_COUNT] = white_balls
        .try_into()
        .map_err(|_| anyhow!("Expected 5 white balls, got {}", white_balls.len()))?;
    NumberSet::new(white_balls, powerball).context("Draw has invalid winning numbers")
}

fn array_of(value: &Value) -> Result<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| anyhow!("Expected a list of numbers, got {}", value))
}

fn number_list(values: &[Value]) -> Result<Vec<u8>> {
    values.iter().map(number_of).collect()
}

/// Reads a ball number given either as a JSON number or a numeric string.
fn number_of(value: &Value) -> Result<u8> {
    let n = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    n.and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| anyhow!("Not a ball number: {}", value))
}

/// Reads a dollar amount, tolerating "$1,234" style strings.
fn amount_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// Trims timestamps like "2024-05-01T00:00:00.000" down to the date.
fn normalize_date(raw: &str) -> String {
    raw.get(..10).unwrap_or(raw).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    /// Serves canned responses per URL; unknown URLs fail.
    struct CannedFetcher {
        responses: HashMap<String, Value>,
    }

    impl JsonFetcher for CannedFetcher {
        fn get_json(&self, url: &str, _query: &[(&str, &str)]) -> Result<Value> {
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("connection refused: {}", url))
        }
    }

    fn gateway(responses: Vec<(&str, Value)>) -> DrawGateway<CannedFetcher> {
        let config = GatewayConfig {
            primary_url: "https://primary.test/results".to_string(),
            secondary_url: "https://secondary.test/rows.json".to_string(),
            timeout_secs: 1,
        };
        let fetcher = CannedFetcher {
            responses: responses
                .into_iter()
                .map(|(url, value)| (url.to_string(), value))
                .collect(),
        };
        DrawGateway::new(fetcher, &config)
    }

    fn ny_row() -> Value {
        json!([{
            "draw_date": "2024-05-01T00:00:00.000",
            "winning_numbers": "04 08 22 46 53 05",
            "multiplier": "2"
        }])
    }

    #[test]
    fn test_parse_results_feed_flat_list() {
        let data = json!([
            {"name": "Mega Millions", "numbers": [1, 2, 3, 4, 5, 6]},
            {"name": "Powerball", "numbers": [12, 23, 34, 45, 56, 7],
             "draw_date": "2024-06-01", "power_play": 2, "jackpot": 120000000}
        ]);
        let draw = parse_results_feed(&data).unwrap();
        assert_eq!(draw.winning_numbers.white_balls, [12, 23, 34, 45, 56]);
        assert_eq!(draw.winning_numbers.powerball, 7);
        assert_eq!(draw.multiplier, Some(2));
        assert_eq!(draw.jackpot_amount, 120_000_000);
        assert_eq!(draw.draw_date, "2024-06-01");
        assert_eq!(draw.source, DrawSource::Primary);
    }

    #[test]
    fn test_parse_results_feed_object_formats() {
        let named = json!([{"game": "POWERBALL",
            "winning_numbers": {"white_balls": ["01", "02", "03", "04", "05"], "powerball": "9"}}]);
        assert_eq!(parse_results_feed(&named).unwrap().winning_numbers.powerball, 9);

        let main_bonus = json!([{"name": "powerball",
            "results": {"main": [10, 20, 30, 40, 50], "bonus": 26}}]);
        let draw = parse_results_feed(&main_bonus).unwrap();
        assert_eq!(draw.winning_numbers.white_balls, [10, 20, 30, 40, 50]);
        assert_eq!(draw.multiplier, None);
    }

    #[test]
    fn test_parse_results_feed_rejects_invalid_numbers() {
        let data = json!([{"name": "Powerball", "numbers": [12, 12, 34, 45, 56, 7]}]);
        assert!(parse_results_feed(&data).is_err());
    }

    #[test]
    fn test_parse_open_data_row() {
        let draw = parse_open_data_row(&ny_row()[0]).unwrap();
        assert_eq!(draw.draw_date, "2024-05-01");
        assert_eq!(draw.winning_numbers.white_balls, [4, 8, 22, 46, 53]);
        assert_eq!(draw.winning_numbers.powerball, 5);
        assert_eq!(draw.multiplier, Some(2));
        assert_eq!(draw.source, DrawSource::Secondary);
    }

    #[test]
    fn test_falls_back_to_secondary() {
        let gw = gateway(vec![("https://secondary.test/rows.json", ny_row())]);
        let draw = gw.latest_draw();
        assert_eq!(draw.source, DrawSource::Secondary);
        assert!(!draw.is_mock());
    }

    #[test]
    fn test_primary_wins_when_available() {
        let gw = gateway(vec![
            (
                "https://primary.test/results",
                json!([{"name": "Powerball", "numbers": [1, 2, 3, 4, 5, 6]}]),
            ),
            ("https://secondary.test/rows.json", ny_row()),
        ]);
        assert_eq!(gw.latest_draw().source, DrawSource::Primary);
    }

    #[test]
    fn test_falls_back_to_mock() {
        let gw = gateway(vec![("https://secondary.test/rows.json", json!([]))]);
        let draw = gw.latest_draw();
        assert!(draw.is_mock());
        assert_eq!(draw.winning_numbers.white_balls, [12, 23, 34, 45, 56]);
        assert_eq!(draw.multiplier, Some(3));
    }
}

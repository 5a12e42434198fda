use anyhow::{anyhow, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};

use super::draw::Draw;
use super::numbers::NumberSet;
use super::prize::evaluate;

/// A confirmed ticket line, optionally scored against a draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub numbers: NumberSet,
    pub draw_date: String,
    pub is_winner: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_amount: Option<u64>,
}

impl Ticket {
    /// Creates a ticket from numbers the user confirmed.
    /// Rejects sets that break the range or uniqueness rules.
    pub fn confirm(numbers: NumberSet, draw_date: &str, index: usize) -> Result<Self> {
        if !numbers.is_valid() {
            return Err(anyhow!("Cannot confirm invalid numbers: {}", numbers));
        }
        Ok(Self {
            id: format!("{}-{}", Local::now().format("%Y%m%d%H%M%S"), index + 1),
            numbers,
            draw_date: draw_date.to_string(),
            is_winner: false,
            prize_tier: None,
            prize_amount: None,
        })
    }

    /// Attaches the prize outcome for a draw. The jackpot tier pays the draw's
    /// advertised jackpot.
    pub fn evaluate(&mut self, draw: &Draw) {
        match evaluate(&self.numbers, &draw.winning_numbers, draw.multiplier) {
            Some(outcome) => {
                let amount = if outcome.tier.is_jackpot() {
                    draw.jackpot_amount
                } else {
                    outcome.final_amount
                };
                self.is_winner = true;
                self.prize_tier = Some(outcome.tier.description.to_string());
                self.prize_amount = Some(amount);
            }
            None => {
                self.is_winner = false;
                self.prize_tier = None;
                self.prize_amount = None;
            }
        }
    }
}

//! Number sets and the validation rules every emitted set must satisfy.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Lowest white ball number.
pub const WHITE_BALL_MIN: u8 = 1;
/// Highest white ball number.
pub const WHITE_BALL_MAX: u8 = 69;
/// Lowest powerball number.
pub const POWERBALL_MIN: u8 = 1;
/// Highest powerball number.
pub const POWERBALL_MAX: u8 = 26;
/// Number of white balls on one ticket line.
pub const WHITE_BALL_COUNT: usize = 5;

/// Multipliers the Power Play add-on can draw.
const POWER_PLAY_MULTIPLIERS: [u8; 5] = [2, 3, 4, 5, 10];

/// One ticket line: five white balls, one powerball, optional Power Play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberSet {
    /// White balls in the order they were read
    pub white_balls: [u8; WHITE_BALL_COUNT],
    pub powerball: u8,
    /// Power Play multiplier selection, if the ticket carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_play: Option<u8>,
}

impl NumberSet {
    /// Builds a validated number set, describing the first violated rule on failure.
    pub fn new(white_balls: [u8; WHITE_BALL_COUNT], powerball: u8) -> Result<Self> {
        if let Some(ball) = white_balls
            .iter()
            .find(|&&b| !(WHITE_BALL_MIN..=WHITE_BALL_MAX).contains(&b))
        {
            return Err(anyhow!(
                "White ball {} out of range {}-{}",
                ball,
                WHITE_BALL_MIN,
                WHITE_BALL_MAX
            ));
        }
        if !(POWERBALL_MIN..=POWERBALL_MAX).contains(&powerball) {
            return Err(anyhow!(
                "Powerball {} out of range {}-{}",
                powerball,
                POWERBALL_MIN,
                POWERBALL_MAX
            ));
        }
        if !has_distinct_white_balls(&white_balls) {
            return Err(anyhow!("White balls must be distinct: {:?}", white_balls));
        }

        Ok(Self {
            white_balls,
            powerball,
            power_play: None,
        })
    }

    /// Builds a number set from a slice of white balls without validating it.
    /// Returns None when the slice does not hold exactly five values.
    pub fn from_parts(white_balls: &[u8], powerball: u8) -> Option<Self> {
        let white_balls: [u8; WHITE_BALL_COUNT] = white_balls.try_into().ok()?;
        Some(Self {
            white_balls,
            powerball,
            power_play: None,
        })
    }

    /// Attaches a Power Play selection.
    pub fn with_power_play(mut self, multiplier: u8) -> Self {
        self.power_play = Some(multiplier);
        self
    }

    pub fn is_valid(&self) -> bool {
        is_valid(&self.white_balls, self.powerball)
    }

    /// White balls in ascending order.
    pub fn sorted_white_balls(&self) -> [u8; WHITE_BALL_COUNT] {
        let mut sorted = self.white_balls;
        sorted.sort_unstable();
        sorted
    }

    /// True when both sets hold the same white balls (in any order) and the same powerball.
    pub fn same_numbers(&self, other: &NumberSet) -> bool {
        self.powerball == other.powerball && self.sorted_white_balls() == other.sorted_white_balls()
    }
}

impl fmt::Display for NumberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whites = self
            .white_balls
            .iter()
            .map(|b| format!("{:02}", b))
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{} PB {:02}", whites, self.powerball)?;
        if let Some(multiplier) = self.power_play {
            write!(f, " (Power Play {}x)", multiplier)?;
        }
        Ok(())
    }
}

/// Range and uniqueness check for one ticket line.
pub fn is_valid(white_balls: &[u8], powerball: u8) -> bool {
    white_balls.len() == WHITE_BALL_COUNT
        && white_balls
            .iter()
            .all(|b| (WHITE_BALL_MIN..=WHITE_BALL_MAX).contains(b))
        && (POWERBALL_MIN..=POWERBALL_MAX).contains(&powerball)
        && has_distinct_white_balls(white_balls)
}

/// True for multipliers the Power Play draw can produce.
pub fn is_valid_multiplier(multiplier: u8) -> bool {
    POWER_PLAY_MULTIPLIERS.contains(&multiplier)
}

fn has_distinct_white_balls(white_balls: &[u8]) -> bool {
    white_balls.iter().collect::<HashSet<_>>().len() == WHITE_BALL_COUNT
}

/// Removes repeated sets, keeping the first occurrence of each.
pub fn dedup_number_sets(sets: Vec<NumberSet>) -> Vec<NumberSet> {
    let mut unique: Vec<NumberSet> = Vec::with_capacity(sets.len());
    for set in sets {
        if !unique.iter().any(|existing| existing.same_numbers(&set)) {
            unique.push(set);
        }
    }
    unique
}

/// Appends the sets from `incoming` that are not already in `accumulated`.
/// Returns how many were added.
pub fn merge_unique(accumulated: &mut Vec<NumberSet>, incoming: Vec<NumberSet>) -> usize {
    let before = accumulated.len();
    for set in incoming {
        if !accumulated.iter().any(|existing| existing.same_numbers(&set)) {
            accumulated.push(set);
        }
    }
    accumulated.len() - before
}

//! Prize tiers and match evaluation.

use serde::Serialize;

use super::numbers::NumberSet;

/// Match counts a tier pays out for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchRule {
    pub white_matches: u8,
    pub powerball: bool,
}

/// One row of the prize table.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct PrizeTier {
    pub name: &'static str,
    pub description: &'static str,
    /// Base prize in dollars. Zero for the jackpot, whose amount varies per draw.
    pub base_amount: u64,
    pub match_rule: MatchRule,
}

impl PrizeTier {
    pub fn is_jackpot(&self) -> bool {
        self.match_rule.white_matches == 5 && self.match_rule.powerball
    }

    /// Power Play never multiplies the jackpot or the fixed $1 Million prize.
    pub fn accepts_multiplier(&self) -> bool {
        !self.is_jackpot() && self.base_amount < SECOND_TIER_AMOUNT
    }
}

const SECOND_TIER_AMOUNT: u64 = 1_000_000;

const fn tier(
    name: &'static str,
    description: &'static str,
    base_amount: u64,
    white_matches: u8,
    powerball: bool,
) -> PrizeTier {
    PrizeTier {
        name,
        description,
        base_amount,
        match_rule: MatchRule {
            white_matches,
            powerball,
        },
    }
}

/// Prize table, highest tier first. Each match rule appears at most once.
pub static PRIZE_TIERS: [PrizeTier; 9] = [
    tier("Jackpot", "5 white balls + Powerball", 0, 5, true),
    tier("$1 Million", "5 white balls (no Powerball)", SECOND_TIER_AMOUNT, 5, false),
    tier("$50,000", "4 white balls + Powerball", 50_000, 4, true),
    tier("$100", "4 white balls (no Powerball)", 100, 4, false),
    tier("$100", "3 white balls + Powerball", 100, 3, true),
    tier("$7", "3 white balls (no Powerball)", 7, 3, false),
    tier("$7", "2 white balls + Powerball", 7, 2, true),
    tier("$4", "1 white ball + Powerball", 4, 1, true),
    tier("$4", "Powerball only", 4, 0, true),
];

/// Result of scoring one number set against a draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrizeOutcome {
    pub tier: &'static PrizeTier,
    /// Multiplier in effect for the draw, if one was supplied
    pub multiplier: Option<u8>,
    /// Payout in dollars after Power Play. Zero for the jackpot.
    pub final_amount: u64,
}

/// Counts white balls shared by both sets, by value.
pub fn count_white_matches(user: &NumberSet, winning: &NumberSet) -> u8 {
    user.white_balls
        .iter()
        .filter(|ball| winning.white_balls.contains(ball))
        .count() as u8
}

/// Looks up the tier for a match result.
pub fn find_tier(white_matches: u8, powerball: bool) -> Option<&'static PrizeTier> {
    PRIZE_TIERS.iter().find(|tier| {
        tier.match_rule
            == MatchRule {
                white_matches,
                powerball,
            }
    })
}

/// Scores a user's number set against the winning numbers.
///
/// The multiplier is applied only when the user's set carries a Power Play
/// selection and the tier accepts multipliers.
pub fn evaluate(
    user: &NumberSet,
    winning: &NumberSet,
    multiplier: Option<u8>,
) -> Option<PrizeOutcome> {
    let white_matches = count_white_matches(user, winning);
    let powerball_match = user.powerball == winning.powerball;
    let tier = find_tier(white_matches, powerball_match)?;

    let final_amount = match multiplier {
        Some(m) if user.power_play.is_some() && tier.accepts_multiplier() => {
            tier.base_amount * m as u64
        }
        _ => tier.base_amount,
    };

    Some(PrizeOutcome {
        tier,
        multiplier,
        final_amount,
    })
}

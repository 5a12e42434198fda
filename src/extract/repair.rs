//! Repairs for candidates that fail validation because of digit transposition.
//!
//! OCR on thermal ticket paper sometimes swaps the two digits of a number
//! ("91" for "19"). A value outside its range whose transposition lands
//! inside the range, without colliding with another value, is taken to be
//! the transposed reading.

use crate::lottery::numbers::{
    is_valid, NumberSet, POWERBALL_MAX, POWERBALL_MIN, WHITE_BALL_MAX, WHITE_BALL_MIN,
};

/// Swaps the digits of a two-digit value.
fn transpose(value: u8) -> Option<u8> {
    if (10..100).contains(&value) {
        Some((value % 10) * 10 + value / 10)
    } else {
        None
    }
}

/// Returns a repaired, valid set, or None when no repair applies.
///
/// Every slot is repaired against the original values only, so the result
/// does not depend on the order slots are visited in.
pub fn repair_candidate(white_balls: &[u8], powerball: u8) -> Option<NumberSet> {
    let mut repaired_whites = white_balls.to_vec();
    let mut changed = false;

    for (slot, &value) in white_balls.iter().enumerate() {
        if (WHITE_BALL_MIN..=WHITE_BALL_MAX).contains(&value) {
            continue;
        }
        let Some(swapped) = transpose(value) else {
            continue;
        };
        if (WHITE_BALL_MIN..=WHITE_BALL_MAX).contains(&swapped) && !white_balls.contains(&swapped) {
            repaired_whites[slot] = swapped;
            changed = true;
        }
    }

    let mut repaired_powerball = powerball;
    if !(POWERBALL_MIN..=POWERBALL_MAX).contains(&powerball) {
        if let Some(swapped) = transpose(powerball).filter(|s| (POWERBALL_MIN..=POWERBALL_MAX).contains(s)) {
            repaired_powerball = swapped;
            changed = true;
        }
    }

    if !changed || !is_valid(&repaired_whites, repaired_powerball) {
        return None;
    }

    crate::log_debug(&format!(
        "Repaired transposed digits: {:?}+{} -> {:?}+{}",
        white_balls, powerball, repaired_whites, repaired_powerball
    ));
    NumberSet::from_parts(&repaired_whites, repaired_powerball)
}

/// Accepts a candidate as-is when valid, otherwise tries a repair.
pub fn accept_candidate(white_balls: &[u8], powerball: u8) -> Option<NumberSet> {
    if is_valid(white_balls, powerball) {
        return NumberSet::from_parts(white_balls, powerball);
    }
    crate::log_debug(&format!(
        "Rejected candidate {:?}+{}",
        white_balls, powerball
    ));
    repair_candidate(white_balls, powerball)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpose() {
        assert_eq!(transpose(91), Some(19));
        assert_eq!(transpose(70), Some(7));
        assert_eq!(transpose(7), None);
    }

    #[test]
    fn test_repairs_out_of_range_white_ball() {
        let set = repair_candidate(&[5, 91, 36, 49, 64], 20).unwrap();
        assert_eq!(set.white_balls, [5, 19, 36, 49, 64]);
    }

    #[test]
    fn test_repairs_powerball() {
        let set = repair_candidate(&[5, 19, 36, 49, 64], 52).unwrap();
        assert_eq!(set.powerball, 25);
    }

    #[test]
    fn test_no_repair_when_transposition_collides() {
        // 91 -> 19, but 19 is already on the line
        assert!(repair_candidate(&[19, 91, 36, 49, 64], 20).is_none());
    }

    #[test]
    fn test_no_repair_for_valid_or_hopeless_sets() {
        assert!(repair_candidate(&[5, 19, 36, 49, 64], 20).is_none());
        assert!(repair_candidate(&[5, 19, 36, 49, 99], 20).is_none());
        assert!(repair_candidate(&[5, 19, 36, 49, 64], 0).is_none());
    }

    #[test]
    fn test_repair_is_order_independent() {
        let a = repair_candidate(&[82, 91, 36, 49, 64], 20).unwrap();
        let b = repair_candidate(&[91, 82, 36, 49, 64], 20).unwrap();
        assert!(a.same_numbers(&b));
    }

    #[test]
    fn test_accept_candidate() {
        assert!(accept_candidate(&[20, 30, 37, 55, 61], 21).is_some());
        assert!(accept_candidate(&[20, 20, 37, 55, 61], 21).is_none());
        assert_eq!(
            accept_candidate(&[20, 30, 37, 55, 61], 62).unwrap().powerball,
            26
        );
    }
}

//! Lottery domain types: number sets, prize evaluation, tickets and draws.

pub mod draw;
pub mod numbers;
pub mod prize;
pub mod ticket;

pub use draw::{Draw, DrawGateway, DrawSource};
pub use numbers::{dedup_number_sets, is_valid, merge_unique, NumberSet};
pub use prize::{evaluate, PrizeOutcome, PrizeTier, PRIZE_TIERS};
pub use ticket::Ticket;

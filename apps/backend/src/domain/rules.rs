//! Game rule constants and predicates.

use crate::domain::cards::Card;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 6;

pub const NICKNAME_MIN_CHARS: usize = 1;
pub const NICKNAME_MAX_CHARS: usize = 20;

/// Burst predicate. The just-drawn card is already part of `field`, so
/// a burst means the field holds at least three cards and the drawn
/// value appears at least twice. Fields smaller than three never burst.
pub fn is_burst(field: &[Card], drawn: Card) -> bool {
    field.len() >= 3 && field.iter().filter(|&&c| c == drawn).count() >= 2
}

pub fn nickname_is_valid(nickname: &str) -> bool {
    let chars = nickname.chars().count();
    (NICKNAME_MIN_CHARS..=NICKNAME_MAX_CHARS).contains(&chars)
}

pub fn max_players_is_valid(max_players: u8) -> bool {
    (MIN_PLAYERS..=MAX_PLAYERS).contains(&(max_players as usize))
}

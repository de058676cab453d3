//! Card values and the shared deck population.
//!
//! Cards carry a face value from 1 to 10. Low values are plentiful,
//! high values scarce: values 1-5 appear 13 times each and values 6-10
//! appear 9 times each, 110 cards in total.

use rand::seq::SliceRandom;

/// A card is just its face value.
pub type Card = u8;

/// (value, copies) pairs making up the full population.
pub const CARD_DISTRIBUTION: [(Card, usize); 10] = [
    (1, 13),
    (2, 13),
    (3, 13),
    (4, 13),
    (5, 13),
    (6, 9),
    (7, 9),
    (8, 9),
    (9, 9),
    (10, 9),
];

/// Cards in a fresh deck.
pub const DECK_SIZE: usize = 110;

/// Build the full 110-card population in value order.
pub fn full_population() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for (value, copies) in CARD_DISTRIBUTION {
        deck.extend(std::iter::repeat(value).take(copies));
    }
    deck
}

/// Build a freshly shuffled deck for a new game.
pub fn shuffled_deck() -> Vec<Card> {
    let mut deck = full_population();
    deck.shuffle(&mut rand::rng());
    deck
}

use std::collections::BTreeMap;

use crate::domain::cards::{full_population, shuffled_deck, CARD_DISTRIBUTION, DECK_SIZE};

fn counts(deck: &[u8]) -> BTreeMap<u8, usize> {
    let mut map = BTreeMap::new();
    for &card in deck {
        *map.entry(card).or_insert(0) += 1;
    }
    map
}

#[test]
fn full_population_has_110_cards() {
    assert_eq!(full_population().len(), DECK_SIZE);
}

#[test]
fn full_population_matches_distribution() {
    let by_value = counts(&full_population());
    for (value, copies) in CARD_DISTRIBUTION {
        assert_eq!(by_value.get(&value), Some(&copies), "value {value}");
    }
    // No values outside 1..=10
    assert_eq!(by_value.len(), 10);
}

#[test]
fn low_values_outnumber_high_values() {
    let by_value = counts(&full_population());
    assert_eq!(by_value[&1], 13);
    assert_eq!(by_value[&5], 13);
    assert_eq!(by_value[&6], 9);
    assert_eq!(by_value[&10], 9);
}

#[test]
fn shuffled_deck_preserves_the_population() {
    let deck = shuffled_deck();
    assert_eq!(deck.len(), DECK_SIZE);
    assert_eq!(counts(&deck), counts(&full_population()));
}

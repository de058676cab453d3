//! Domain layer: pure game rules, records, and error taxonomy.

pub mod cards;
pub mod errors;
pub mod rules;
pub mod state;

#[cfg(test)]
mod tests_cards;

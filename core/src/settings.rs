// SPDX-License-Identifier: MIT OR Apache-2.0

//! Game settings consumed by the engine at construction time

use crate::{Card, CardSet};
use serde::{Deserialize, Serialize};

/// Minimum number of enabled cards needed to deal a game
pub const MIN_CARDS: usize = 5;

/// Rule variations for a new game
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameSettings {
    /// Card sets left out of the deck
    #[serde(default)]
    pub disabled_card_sets: Vec<CardSet>,
    /// Put one hidden-capable piece on the board for each player
    #[serde(default)]
    pub hidden_pieces: bool,
    /// Fixed deck shuffle, for reproducible games
    #[serde(default)]
    pub seed: Option<u64>,
}

impl GameSettings {
    /// Card sets that take part in the deal.
    ///
    /// Falls back to every set when the enabled ones hold too few cards.
    pub fn enabled_card_sets(&self) -> Vec<CardSet> {
        let enabled: Vec<CardSet> = CardSet::ALL
            .iter()
            .copied()
            .filter(|set| !self.disabled_card_sets.contains(set))
            .collect();
        let count: usize = enabled.iter().map(|set| set.cards().len()).sum();
        if count < MIN_CARDS {
            tracing::warn!(
                enabled = count,
                "Not enough cards enabled for valid gameplay, falling back to all card sets"
            );
            return CardSet::ALL.to_vec();
        }
        enabled
    }

    /// Cards that take part in the deal
    pub fn deck(&self) -> Vec<Card> {
        self.enabled_card_sets()
            .iter()
            .flat_map(|set| set.cards())
            .collect()
    }

    /// The Wind Spirit is in play whenever its cards are
    pub fn wind_spirit(&self) -> bool {
        self.enabled_card_sets().contains(&CardSet::WayOfTheWind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_enables_everything() {
        let settings = GameSettings::default();
        assert_eq!(settings.deck().len(), Card::ALL.len());
        assert!(settings.wind_spirit());
    }

    #[test]
    fn disabling_wind_removes_spirit() {
        let settings = GameSettings {
            disabled_card_sets: vec![CardSet::WayOfTheWind],
            ..Default::default()
        };
        assert!(!settings.wind_spirit());
        assert!(settings.deck().iter().all(|card| card.set() != CardSet::WayOfTheWind));
    }

    #[test]
    fn too_few_cards_falls_back() {
        let settings = GameSettings {
            disabled_card_sets: CardSet::ALL.to_vec(),
            ..Default::default()
        };
        assert_eq!(settings.enabled_card_sets(), CardSet::ALL.to_vec());
    }
}

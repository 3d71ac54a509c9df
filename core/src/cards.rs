// SPDX-License-Identifier: MIT OR Apache-2.0

//! Card catalogue: move offsets, king and Wind Spirit offsets, card sets

use crate::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! offsets {
    ($(($x:expr, $y:expr)),* $(,)?) => {
        &[$(Point { x: $x, y: $y }),*]
    };
}

/// Every card known to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Card {
    // Base game
    Tiger,
    Dragon,
    Frog,
    Rabbit,
    Crab,
    Elephant,
    Goose,
    Rooster,
    Monkey,
    Mantis,
    Horse,
    Ox,
    Crane,
    Boar,
    Eel,
    Cobra,
    // Sensei's Path
    Fox,
    Dog,
    Giraffe,
    Panda,
    Bear,
    Kirin,
    SeaSnake,
    Viper,
    Phoenix,
    Mouse,
    Rat,
    Turtle,
    Tanuki,
    Iguana,
    Sable,
    Otter,
    // Promotional cards
    Goat,
    Sheep,
    Lobster,
    Steer,
    Hornet,
    Centipede,
    Cat,
    Serow,
    Nessie,
    // Way of the Wind
    Bat,
    Eagle,
    Hawk,
    Lion,
    Octopus,
    Rhinoceros,
    Scorpion,
    Spider,
}

/// Which way the card's moves lean; cosmetic only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardDirection {
    Left,
    Right,
    Balanced,
}

/// Expansion a card belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CardSet {
    Base,
    SenseiPath,
    PromotionalPack,
    WayOfTheWind,
}

impl Card {
    /// All cards in catalogue order
    pub const ALL: [Card; 49] = [
        Card::Tiger,
        Card::Dragon,
        Card::Frog,
        Card::Rabbit,
        Card::Crab,
        Card::Elephant,
        Card::Goose,
        Card::Rooster,
        Card::Monkey,
        Card::Mantis,
        Card::Horse,
        Card::Ox,
        Card::Crane,
        Card::Boar,
        Card::Eel,
        Card::Cobra,
        Card::Fox,
        Card::Dog,
        Card::Giraffe,
        Card::Panda,
        Card::Bear,
        Card::Kirin,
        Card::SeaSnake,
        Card::Viper,
        Card::Phoenix,
        Card::Mouse,
        Card::Rat,
        Card::Turtle,
        Card::Tanuki,
        Card::Iguana,
        Card::Sable,
        Card::Otter,
        Card::Goat,
        Card::Sheep,
        Card::Lobster,
        Card::Steer,
        Card::Hornet,
        Card::Centipede,
        Card::Cat,
        Card::Serow,
        Card::Nessie,
        Card::Bat,
        Card::Eagle,
        Card::Hawk,
        Card::Lion,
        Card::Octopus,
        Card::Rhinoceros,
        Card::Scorpion,
        Card::Spider,
    ];

    /// Base offsets, relative to Red's forward direction (negative `y`)
    pub fn moves(&self) -> &'static [Point] {
        match self {
            Card::Tiger => offsets![(0, -2), (0, 1)],
            Card::Dragon => offsets![(-2, -1), (-1, 1), (2, -1), (1, 1)],
            Card::Frog => offsets![(-2, 0), (-1, -1), (1, 1)],
            Card::Rabbit => offsets![(1, -1), (2, 0), (-1, 1)],
            Card::Crab => offsets![(0, -1), (-2, 0), (2, 0)],
            Card::Elephant => offsets![(1, 0), (-1, -1), (1, -1), (-1, 0)],
            Card::Goose => offsets![(-1, 0), (-1, -1), (1, 0), (1, 1)],
            Card::Rooster => offsets![(1, 0), (1, -1), (-1, 0), (-1, 1)],
            Card::Monkey => offsets![(-1, -1), (1, -1), (-1, 1), (1, 1)],
            Card::Mantis => offsets![(-1, -1), (1, -1), (0, 1)],
            Card::Horse => offsets![(0, -1), (-1, 0), (0, 1)],
            Card::Ox => offsets![(0, -1), (1, 0), (0, 1)],
            Card::Crane => offsets![(0, -1), (1, 1), (-1, 1)],
            Card::Boar => offsets![(0, -1), (1, 0), (-1, 0)],
            Card::Eel => offsets![(1, 0), (-1, -1), (-1, 1)],
            Card::Cobra => offsets![(-1, 0), (1, -1), (1, 1)],

            Card::Fox => offsets![(1, -1), (1, 0), (1, 1)],
            Card::Dog => offsets![(-1, -1), (-1, 0), (-1, 1)],
            Card::Giraffe => offsets![(-2, -1), (2, -1), (0, 1)],
            Card::Panda => offsets![(-1, 1), (0, -1), (1, -1)],
            Card::Bear => offsets![(1, 1), (0, -1), (-1, -1)],
            Card::Kirin => offsets![(0, 2), (1, -2), (-1, -2)],
            Card::SeaSnake => offsets![(-1, 1), (0, -1), (2, 0)],
            Card::Viper => offsets![(1, 1), (0, -1), (-2, 0)],
            Card::Phoenix => offsets![(-2, 0), (-1, -1), (1, -1), (2, 0)],
            Card::Mouse => offsets![(-1, 1), (0, -1), (1, 0)],
            Card::Rat => offsets![(1, 1), (0, -1), (-1, 0)],
            Card::Turtle => offsets![(-2, 0), (-1, 1), (1, 1), (2, 0)],
            Card::Tanuki => offsets![(-1, 1), (0, -1), (2, -1)],
            Card::Iguana => offsets![(1, 1), (0, -1), (-2, -1)],
            Card::Sable => offsets![(-2, 0), (-1, 1), (1, -1)],
            Card::Otter => offsets![(2, 0), (1, 1), (-1, -1)],

            Card::Goat => offsets![(-1, 0), (0, 1), (1, -1)],
            Card::Sheep => offsets![(1, 0), (0, 1), (-1, -1)],
            Card::Lobster => offsets![(-1, -1), (-1, 2), (1, -1), (1, 2)],
            Card::Steer => offsets![(1, 0), (-1, 1), (1, 1), (-1, 0)],
            Card::Hornet => offsets![(-2, 2), (0, -1), (1, 0)],
            Card::Centipede => offsets![(-1, 0), (0, -1), (2, 2)],
            Card::Cat => offsets![(-1, 0), (0, -1), (0, 2), (2, 0)],
            Card::Serow => offsets![(-2, 0), (0, -1), (0, 2), (1, 0)],
            Card::Nessie => offsets![(-2, -1), (2, 0), (-1, 1), (1, 1)],

            Card::Bat => offsets![(-1, 0), (1, -1)],
            Card::Eagle => offsets![(-1, -1), (1, -1), (0, 1)],
            Card::Hawk => offsets![(-2, 0), (2, 0), (0, -1)],
            Card::Lion => offsets![(0, -1), (-1, 1), (1, 1)],
            Card::Octopus => offsets![(-1, -1), (1, -1), (-1, 1), (1, 1)],
            Card::Rhinoceros => offsets![(0, -1), (0, -2)],
            Card::Scorpion => offsets![(-1, 0), (1, 0), (0, 1)],
            Card::Spider => offsets![(-1, -1), (1, -1)],
        }
    }

    /// Alternate offsets used when the moving piece is a king
    pub fn king_moves(&self) -> Option<&'static [Point]> {
        match self {
            Card::Eagle => Some(offsets![(0, -1), (-1, 0), (1, 0)]),
            Card::Lion => Some(offsets![(0, -2), (0, -1)]),
            Card::Rhinoceros => Some(offsets![(-1, 0), (1, 0), (0, 1)]),
            _ => None,
        }
    }

    /// Offsets for the Wind Spirit's mandatory second step
    pub fn wind_moves(&self) -> Option<&'static [Point]> {
        match self {
            Card::Bat => Some(offsets![(0, -1), (0, 1)]),
            Card::Eagle => Some(offsets![(-1, 0), (1, 0)]),
            Card::Hawk => Some(offsets![(0, -2)]),
            Card::Lion => Some(offsets![(-1, -1), (1, 1)]),
            Card::Octopus => Some(offsets![(0, -1), (-1, 0), (1, 0)]),
            Card::Rhinoceros => Some(offsets![(0, 1)]),
            Card::Scorpion => Some(offsets![(-1, -1), (1, -1)]),
            Card::Spider => Some(offsets![(0, -2), (0, 1)]),
            _ => None,
        }
    }

    /// Facing tag shown on the card
    pub fn direction(&self) -> CardDirection {
        match self {
            Card::Frog
            | Card::Goose
            | Card::Horse
            | Card::Eel
            | Card::Dog
            | Card::Bear
            | Card::Viper
            | Card::Rat
            | Card::Iguana
            | Card::Otter
            | Card::Sheep
            | Card::Centipede
            | Card::Serow
            | Card::Bat => CardDirection::Left,
            Card::Rabbit
            | Card::Rooster
            | Card::Ox
            | Card::Cobra
            | Card::Fox
            | Card::Panda
            | Card::SeaSnake
            | Card::Mouse
            | Card::Tanuki
            | Card::Sable
            | Card::Goat
            | Card::Hornet
            | Card::Cat
            | Card::Spider => CardDirection::Right,
            _ => CardDirection::Balanced,
        }
    }

    /// Set this card ships in
    pub fn set(&self) -> CardSet {
        let idx = Card::ALL.iter().position(|card| card == self).unwrap_or(0);
        match idx {
            0..=15 => CardSet::Base,
            16..=31 => CardSet::SenseiPath,
            32..=40 => CardSet::PromotionalPack,
            _ => CardSet::WayOfTheWind,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for Card {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Card::ALL
            .iter()
            .find(|card| card.to_string().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("Unknown card: {}", s))
    }
}

impl CardSet {
    /// All sets in display order
    pub const ALL: [CardSet; 4] = [
        CardSet::Base,
        CardSet::SenseiPath,
        CardSet::PromotionalPack,
        CardSet::WayOfTheWind,
    ];

    /// Cards belonging to this set
    pub fn cards(&self) -> Vec<Card> {
        Card::ALL
            .iter()
            .copied()
            .filter(|card| card.set() == *self)
            .collect()
    }

    /// Human readable set name
    pub fn name(&self) -> &'static str {
        match self {
            CardSet::Base => "Base Game",
            CardSet::SenseiPath => "Sensei's Path",
            CardSet::PromotionalPack => "Promotional Cards",
            CardSet::WayOfTheWind => "Way of the Wind",
        }
    }
}

/// UI-facing description of a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDescription {
    pub card: Card,
    pub moves: Vec<Point>,
    pub king_moves: Vec<Point>,
    pub wind_moves: Vec<Point>,
    pub direction: CardDirection,
    pub card_set: CardSet,
}

impl From<Card> for CardDescription {
    fn from(card: Card) -> Self {
        Self {
            card,
            moves: card.moves().to_vec(),
            king_moves: card.king_moves().unwrap_or_default().to_vec(),
            wind_moves: card.wind_moves().unwrap_or_default().to_vec(),
            direction: card.direction(),
            card_set: card.set(),
        }
    }
}

/// A card set together with its cards, for settings screens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSetDescription {
    pub id: CardSet,
    pub name: String,
    pub cards: Vec<CardDescription>,
}

/// List every card set with its cards
pub fn list_card_sets() -> Vec<CardSetDescription> {
    CardSet::ALL
        .iter()
        .map(|set| CardSetDescription {
            id: *set,
            name: set.name().to_string(),
            cards: set.cards().into_iter().map(CardDescription::from).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_sizes() {
        assert_eq!(CardSet::Base.cards().len(), 16);
        assert_eq!(CardSet::SenseiPath.cards().len(), 16);
        assert_eq!(CardSet::PromotionalPack.cards().len(), 9);
        assert_eq!(CardSet::WayOfTheWind.cards().len(), 8);
    }

    #[test]
    fn only_way_of_the_wind_has_wind_moves() {
        for card in Card::ALL {
            assert_eq!(
                card.wind_moves().is_some(),
                card.set() == CardSet::WayOfTheWind,
                "{card}"
            );
        }
    }

    #[test]
    fn card_names_parse_case_insensitively() {
        assert_eq!("seasnake".parse::<Card>(), Ok(Card::SeaSnake));
        assert_eq!(" Tiger ".parse::<Card>(), Ok(Card::Tiger));
        assert!("Unicorn".parse::<Card>().is_err());
    }

    #[test]
    fn description_carries_all_offset_lists() {
        let lion = CardDescription::from(Card::Lion);
        assert_eq!(lion.moves.len(), 3);
        assert_eq!(lion.king_moves, vec![Point::new(0, -2), Point::new(0, -1)]);
        assert_eq!(lion.wind_moves.len(), 2);
        assert_eq!(lion.card_set, CardSet::WayOfTheWind);

        let tiger = CardDescription::from(Card::Tiger);
        assert!(tiger.king_moves.is_empty());
        assert!(tiger.wind_moves.is_empty());
    }

    #[test]
    fn list_covers_every_card() {
        let total: usize = list_card_sets().iter().map(|set| set.cards.len()).sum();
        assert_eq!(total, Card::ALL.len());
    }
}

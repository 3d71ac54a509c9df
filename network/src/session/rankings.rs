// SPDX-License-Identifier: MIT OR Apache-2.0

//! Advisory move-quality overlay for training mode

use onitama_core::agents::RankedAction;
use onitama_core::{Action, Card, Point};
use std::collections::HashMap;

/// Score of one destination for a selected card and piece
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestinationScore {
    pub dst: Point,
    pub score: f32,
}

/// Rankings of every legal move, grouped by selection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoveRankings {
    by_selection: HashMap<(Card, Point), Vec<DestinationScore>>,
    /// Best score over all moves
    pub max: f32,
    /// Worst score over all moves
    pub min: f32,
    /// A newer ranking is being computed
    pub stale: bool,
}

impl MoveRankings {
    /// Group ranked actions by `(card, src)`; discards have no square and
    /// are left out
    pub fn from_ranked(ranked: &[RankedAction]) -> Self {
        let mut rankings = MoveRankings {
            max: f32::MIN,
            min: f32::MAX,
            ..Default::default()
        };
        for entry in ranked {
            let Action::Move { card, src, dst, .. } = entry.action else {
                continue;
            };
            rankings.max = rankings.max.max(entry.score);
            rankings.min = rankings.min.min(entry.score);
            rankings
                .by_selection
                .entry((card, src))
                .or_default()
                .push(DestinationScore {
                    dst,
                    score: entry.score,
                });
        }
        if rankings.by_selection.is_empty() {
            rankings.max = 0.0;
            rankings.min = 0.0;
        }
        rankings
    }

    /// Scores for the destinations of `src` under `card`
    pub fn for_selection(&self, card: Card, src: Point) -> &[DestinationScore] {
        self.by_selection
            .get(&(card, src))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Score scaled to `0.0..=1.0` between `min` and `max`
    pub fn normalized(&self, score: f32) -> f32 {
        if self.max <= self.min {
            return 1.0;
        }
        ((score - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    pub fn is_empty(&self) -> bool {
        self.by_selection.is_empty()
    }

    /// Copy of these rankings flagged as outdated
    pub fn as_stale(&self) -> Self {
        Self {
            stale: true,
            ..self.clone()
        }
    }
}

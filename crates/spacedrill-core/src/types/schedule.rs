// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::Serialize;

use crate::types::card_state::CardState;
use crate::types::ids::CardId;
use crate::types::ids::LearnerId;
use crate::types::timestamp::Timestamp;

/// The numeric scheduling parameters of a card, i.e. the part of its state
/// that the scheduler reads and writes.
#[derive(Clone, Copy, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Multiplier controlling how fast review intervals grow.
    pub ease_factor: f64,
    /// Minutes until the next review.
    pub interval: i64,
    /// Consecutive qualifying reviews since the last reset.
    pub repetitions: u32,
    #[serde(rename = "cardState")]
    pub state: CardState,
}

/// The scheduling record for one (learner, card) pair.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardScheduleState {
    pub learner_id: LearnerId,
    pub card_id: CardId,
    #[serde(flatten)]
    pub schedule: Schedule,
    /// The card is eligible for review once `now >= next_review_date`.
    pub next_review_date: Timestamp,
    /// Absent until the first review.
    pub last_reviewed_at: Option<Timestamp>,
    /// When the record was provisioned.
    pub created_at: Timestamp,
    /// Optimistic concurrency token, bumped on every write.
    #[serde(skip)]
    pub version: i64,
}

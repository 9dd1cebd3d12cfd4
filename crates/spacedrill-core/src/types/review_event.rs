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

use crate::types::ids::CardId;
use crate::types::ids::LearnerId;
use crate::types::outcome::Outcome;
use crate::types::timestamp::Timestamp;

/// An immutable record of a single review, written alongside the state
/// change it caused.
#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub learner_id: LearnerId,
    pub card_id: CardId,
    pub result: Outcome,
    pub time_taken_seconds: Option<u32>,
    pub ease_factor_after: f64,
    pub interval_after: i64,
    pub reviewed_at: Timestamp,
}

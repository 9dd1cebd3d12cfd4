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

use crate::types::ids::LearnerId;
use crate::types::ids::StageId;
use crate::types::ids::UnitId;
use crate::types::timestamp::Timestamp;

#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitProgress {
    pub learner_id: LearnerId,
    pub unit_id: UnitId,
    pub is_completed: bool,
    pub completed_at: Option<Timestamp>,
    pub watch_time_seconds: u64,
}

impl UnitProgress {
    /// Progress for a unit the learner has never interacted with.
    pub fn untouched(learner_id: LearnerId, unit_id: UnitId) -> Self {
        Self {
            learner_id,
            unit_id,
            is_completed: false,
            completed_at: None,
            watch_time_seconds: 0,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageProgress {
    pub learner_id: LearnerId,
    pub stage_id: StageId,
    pub is_completed: bool,
    pub completed_at: Option<Timestamp>,
}

impl StageProgress {
    pub fn untouched(learner_id: LearnerId, stage_id: StageId) -> Self {
        Self {
            learner_id,
            stage_id,
            is_completed: false,
            completed_at: None,
        }
    }
}

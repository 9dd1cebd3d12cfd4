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

use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::Error;
use crate::error::Fallible;
use crate::types::ids::CardId;
use crate::types::ids::StageId;
use crate::types::ids::UnitId;

/// Read access to the content hierarchy: stages contain units, units
/// contain cards. Both stages and the units within a stage are ordered.
pub trait Catalog: Send + Sync {
    /// All stages, in order.
    fn stages(&self) -> Vec<StageId>;

    /// The units of a stage, in order.
    fn units_in_stage(&self, stage: &StageId) -> Fallible<Vec<UnitId>>;

    fn cards_in_unit(&self, unit: &UnitId) -> Fallible<Vec<CardId>>;

    fn stage_of(&self, unit: &UnitId) -> Fallible<StageId>;
}

/// A stage, as written in a catalog file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageEntry {
    pub id: StageId,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub units: Vec<UnitEntry>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitEntry {
    pub id: UnitId,
    #[serde(default)]
    pub cards: Vec<CardId>,
}

/// A catalog held entirely in memory.
pub struct StaticCatalog {
    stages: Vec<StageEntry>,
    stage_index: HashMap<StageId, usize>,
    /// Maps a unit to the index of its stage and its index within the stage.
    unit_index: HashMap<UnitId, (usize, usize)>,
}

impl StaticCatalog {
    pub fn new(mut stages: Vec<StageEntry>) -> Fallible<Self> {
        stages.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        let mut stage_index = HashMap::new();
        let mut unit_index = HashMap::new();
        let mut cards = HashSet::new();
        for (i, stage) in stages.iter().enumerate() {
            if stage_index.insert(stage.id.clone(), i).is_some() {
                return Err(Error::Catalog(format!("duplicate stage: {}", stage.id)));
            }
            for (j, unit) in stage.units.iter().enumerate() {
                if unit_index.insert(unit.id.clone(), (i, j)).is_some() {
                    return Err(Error::Catalog(format!("duplicate unit: {}", unit.id)));
                }
                for card in &unit.cards {
                    if !cards.insert(card) {
                        return Err(Error::Catalog(format!("duplicate card: {card}")));
                    }
                }
            }
        }
        Ok(Self {
            stages,
            stage_index,
            unit_index,
        })
    }

    /// Load a catalog from a directory. Every `.toml` file under the
    /// directory describes one stage.
    pub fn load(directory: &Path) -> Fallible<Self> {
        if !directory.is_dir() {
            return Err(Error::Catalog(format!(
                "catalog directory does not exist: {}",
                directory.display()
            )));
        }
        let mut stages = Vec::new();
        for entry in WalkDir::new(directory).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
                let content = read_to_string(path)?;
                let stage = parse_stage(&content)
                    .map_err(|e| Error::Catalog(format!("{}: {e}", path.display())))?;
                stages.push(stage);
            }
        }
        log::debug!(
            "Loaded {} stages from {}",
            stages.len(),
            directory.display()
        );
        Self::new(stages)
    }

    fn unit(&self, unit: &UnitId) -> Fallible<&UnitEntry> {
        let (i, j) = self
            .unit_index
            .get(unit)
            .ok_or_else(|| Error::NotFound(format!("unit {unit}")))?;
        Ok(&self.stages[*i].units[*j])
    }
}

fn parse_stage(content: &str) -> Result<StageEntry, toml::de::Error> {
    toml::from_str(content)
}

impl Catalog for StaticCatalog {
    fn stages(&self) -> Vec<StageId> {
        self.stages.iter().map(|stage| stage.id.clone()).collect()
    }

    fn units_in_stage(&self, stage: &StageId) -> Fallible<Vec<UnitId>> {
        let i = self
            .stage_index
            .get(stage)
            .ok_or_else(|| Error::NotFound(format!("stage {stage}")))?;
        Ok(self.stages[*i].units.iter().map(|u| u.id.clone()).collect())
    }

    fn cards_in_unit(&self, unit: &UnitId) -> Fallible<Vec<CardId>> {
        Ok(self.unit(unit)?.cards.clone())
    }

    fn stage_of(&self, unit: &UnitId) -> Fallible<StageId> {
        let (i, _) = self
            .unit_index
            .get(unit)
            .ok_or_else(|| Error::NotFound(format!("unit {unit}")))?;
        Ok(self.stages[*i].id.clone())
    }
}

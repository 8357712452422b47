//! Completed workflow stages
//!
//! A stage (role) is complete automatically when some component file
//! satisfies it, either by its name or through its annotation file's
//! content. A per-element override can force a stage complete or incomplete.

use super::ProjectElement;
use crate::models::component_file::STAGE_FIELD_PREFIX;
use crate::models::ComponentRole;
use saymore_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Override for one stage of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum StageCompleteType {
    /// Complete iff some file satisfies the stage
    #[default]
    Auto,
    Complete,
    NotComplete,
}

impl fmt::Display for StageCompleteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Auto => "Auto",
            Self::Complete => "Complete",
            Self::NotComplete => "NotComplete",
        };
        f.write_str(s)
    }
}

impl FromStr for StageCompleteType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Auto" => Ok(Self::Auto),
            "Complete" => Ok(Self::Complete),
            "NotComplete" => Ok(Self::NotComplete),
            other => Err(Error::InvalidInput(format!(
                "Unknown stage override '{}' (expected Auto, Complete or NotComplete)",
                other
            ))),
        }
    }
}

impl ProjectElement {
    /// Roles completed for this element, in declared order
    ///
    /// With `apply_overrides`, roles overridden `NotComplete` are dropped and
    /// roles overridden `Complete` are included regardless of files.
    pub fn get_completed_stages(&self, apply_overrides: bool) -> Result<Vec<ComponentRole>> {
        let element = self.element_ref();
        let files = self.get_component_files()?;

        let mut completed: HashMap<String, ComponentRole> = HashMap::new();
        for file in &files {
            for role in file.assigned_roles(&element, &self.roles) {
                completed.insert(role.id().to_string(), role);
            }
        }

        if self.roles.iter().any(|r| !completed.contains_key(r.id())) {
            for file in &files {
                for role in file.assigned_roles_from_annotation_file(&element, &self.roles) {
                    completed.insert(role.id().to_string(), role);
                }
            }
        }

        let stages = self
            .roles
            .iter()
            .filter(|role| {
                let auto = completed.contains_key(role.id());
                if !apply_overrides {
                    return auto;
                }
                match self.stage_override(role.id()) {
                    StageCompleteType::Auto => auto,
                    StageCompleteType::Complete => true,
                    StageCompleteType::NotComplete => false,
                }
            })
            .cloned()
            .collect();

        Ok(stages)
    }

    /// Completed stages with overrides applied
    pub fn get_completed_stages_default(&self) -> Result<Vec<ComponentRole>> {
        self.get_completed_stages(true)
    }

    /// Current override for `role_id` (`Auto` if none was set)
    pub fn stage_override(&self, role_id: &str) -> StageCompleteType {
        self.stage_overrides
            .get(role_id)
            .copied()
            .unwrap_or_default()
    }

    /// All overrides, keyed by role id
    pub fn stage_overrides(&self) -> &HashMap<String, StageCompleteType> {
        &self.stage_overrides
    }

    /// Set the override for one declared role (persisted on the next save)
    pub fn set_stage_override(&mut self, role_id: &str, value: StageCompleteType) -> Result<()> {
        if !self.roles.iter().any(|r| r.id() == role_id) {
            return Err(Error::NotFound(format!(
                "No stage '{}' for a {}",
                role_id, self.kind
            )));
        }
        debug!(element = %self.id, role = role_id, value = %value, "Stage override set");
        self.stage_overrides.insert(role_id.to_string(), value);
        Ok(())
    }

    pub(super) fn write_stage_overrides_to_fields(&self) {
        for role in self.roles.iter() {
            let field_id = format!("{}{}", STAGE_FIELD_PREFIX, role.id());
            match self.stage_override(role.id()) {
                // Auto is the default and is not stored
                StageCompleteType::Auto => self.metadata_file.set_field_value(&field_id, ""),
                value => self
                    .metadata_file
                    .set_field_value(&field_id, &value.to_string()),
            }
        }
    }

    pub(super) fn read_stage_overrides_from_fields(&mut self) {
        for role in self.roles.iter() {
            let field_id = format!("{}{}", STAGE_FIELD_PREFIX, role.id());
            let value = match self.metadata_file.field_value(&field_id) {
                None => StageCompleteType::Auto,
                Some(text) => text.parse().unwrap_or_else(|e| {
                    warn!(element = %self.id, field = %field_id, error = %e, "Ignoring stage override");
                    StageCompleteType::Auto
                }),
            };
            self.stage_overrides.insert(role.id().to_string(), value);
        }
    }
}

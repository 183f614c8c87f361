// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-cell metadata record

use serde::{Deserialize, Serialize};

/// Which taxonomy label of a cell a rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelField {
    Class,
    Subclass,
}

/// One annotated cell. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRecord {
    pub class_label: String,
    pub subclass_label: String,
    /// Parcellation structure (region) the cell was assigned to
    pub structure: String,
    /// Finer parcellation unit within `structure` (e.g. "VISp2/3")
    pub substructure: String,
}

impl CellRecord {
    pub fn new(
        class_label: impl Into<String>,
        subclass_label: impl Into<String>,
        structure: impl Into<String>,
        substructure: impl Into<String>,
    ) -> Self {
        Self {
            class_label: class_label.into(),
            subclass_label: subclass_label.into(),
            structure: structure.into(),
            substructure: substructure.into(),
        }
    }

    pub fn label(&self, field: LabelField) -> &str {
        match field {
            LabelField::Class => &self.class_label,
            LabelField::Subclass => &self.subclass_label,
        }
    }
}

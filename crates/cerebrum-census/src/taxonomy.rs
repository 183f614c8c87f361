// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Cell-type taxonomy: lineage rules and named category label sets.

A taxonomy is declared as a [`TaxonomySpec`] (serde-friendly, loadable from
TOML) and compiled into a [`Taxonomy`], which owns the ordered flag column
schema and the label lookup tables used by the classifier.

## Column layout

```text
E, I, O,
GABA, Vip, Pvalb, Sst, Lamp5, Sst-Chodl, GABA-Other,
Glut, ET, CT, NP, IT, IT-ENT, IT-CTX, IT-Other, Glut-Other
```

Top-level flags first, then one block per lineage (inhibitory, excitatory).
Inside a block, categories are laid out level by level.

## Invariants checked at compile time

- Sibling categories have pairwise disjoint label sets
- A category either lists labels or has children, never both; a parent's
  label set is the union of its children's
- Column names are non-empty and unique
- The schema fits in a [`FlagSet`]
*/

use std::sync::Arc;

use ahash::AHashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::cell::{CellRecord, LabelField};
use crate::classify::FlagSet;
use crate::types::{CensusError, CensusResult};

/// Name of the ratio column derived from a category count
pub fn fraction_column(category: &str) -> String {
    format!("{} fraction", category)
}

/// `label(field).ends_with(suffix)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffixRule {
    pub field: LabelField,
    pub suffix: String,
}

impl SuffixRule {
    pub fn new(field: LabelField, suffix: impl Into<String>) -> Self {
        Self {
            field,
            suffix: suffix.into(),
        }
    }

    pub fn matches(&self, record: &CellRecord) -> bool {
        record.label(self.field).ends_with(&self.suffix)
    }
}

/// Named category: an exact set of subclass labels, or a group of child categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub children: Vec<CategorySpec>,
}

impl CategorySpec {
    pub fn leaf(name: &str, labels: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            children: Vec::new(),
        }
    }

    pub fn nested(name: &str, children: Vec<CategorySpec>) -> Self {
        Self {
            name: name.to_string(),
            labels: Vec::new(),
            children,
        }
    }
}

/// One lineage (excitatory or inhibitory) and its subtype hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageSpec {
    /// Top-level flag column ("E" / "I")
    pub flag: String,
    /// Lineage column ("Glut" / "GABA")
    pub name: String,
    pub rule: SuffixRule,
    #[serde(default)]
    pub categories: Vec<CategorySpec>,
    /// Synthesized catch-all column ("Glut-Other")
    pub other: String,
}

/// Declarative taxonomy, as stored in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomySpec {
    /// Flag for records matching neither lineage ("O")
    pub other_flag: String,
    pub excitatory: LineageSpec,
    pub inhibitory: LineageSpec,
}

/// A ratio column: `count(column) / count(parent)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtypeFraction {
    pub category: String,
    pub column: usize,
    pub parent: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledLineage {
    pub(crate) flag: usize,
    pub(crate) column: usize,
    pub(crate) other: usize,
    pub(crate) rule: SuffixRule,
    /// subclass label -> category columns from the lineage level down to the leaf
    pub(crate) label_paths: AHashMap<String, Vec<usize>>,
}

/// Compiled, validated taxonomy. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    columns: Arc<[String]>,
    index: AHashMap<String, usize>,
    other_flag: usize,
    pub(crate) excitatory: CompiledLineage,
    pub(crate) inhibitory: CompiledLineage,
    fractions: Vec<SubtypeFraction>,
    spec: TaxonomySpec,
}

#[derive(Default)]
struct ColumnBuilder {
    columns: Vec<String>,
    index: AHashMap<String, usize>,
}

impl ColumnBuilder {
    fn push(&mut self, name: &str, context: &str) -> CensusResult<usize> {
        if name.trim().is_empty() {
            return Err(CensusError::EmptyName(context.to_string()));
        }
        if self.index.contains_key(name) {
            return Err(CensusError::DuplicateColumn(name.to_string()));
        }
        let idx = self.columns.len();
        self.columns.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        Ok(idx)
    }
}

impl Taxonomy {
    /// Compile and validate a taxonomy spec
    ///
    /// # Errors
    ///
    /// Returns error if sibling categories share a label, a column name is
    /// empty or repeated, a category mixes labels and children, or the schema
    /// exceeds [`FlagSet::CAPACITY`] columns.
    pub fn new(spec: TaxonomySpec) -> CensusResult<Self> {
        let mut builder = ColumnBuilder::default();

        // Top-level flags, in E, I, O order
        let excitatory_flag = builder.push(&spec.excitatory.flag, "excitatory flag")?;
        let inhibitory_flag = builder.push(&spec.inhibitory.flag, "inhibitory flag")?;
        let other_flag = builder.push(&spec.other_flag, "other flag")?;

        let mut fractions = Vec::new();
        let inhibitory =
            compile_lineage(&mut builder, &spec.inhibitory, inhibitory_flag, &mut fractions)?;
        let excitatory =
            compile_lineage(&mut builder, &spec.excitatory, excitatory_flag, &mut fractions)?;

        if builder.columns.len() > FlagSet::CAPACITY {
            return Err(CensusError::TooManyColumns {
                count: builder.columns.len(),
                capacity: FlagSet::CAPACITY,
            });
        }

        Ok(Self {
            columns: builder.columns.into(),
            index: builder.index,
            other_flag,
            excitatory,
            inhibitory,
            fractions,
            spec,
        })
    }

    /// Built-in taxonomy for the ABC mouse whole-brain atlas labels
    pub fn abc_mouse() -> &'static Taxonomy {
        &ABC_MOUSE_TAXONOMY
    }

    /// Flag columns in schema order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Shared handle on the column schema (cheap to clone into tables)
    pub fn shared_columns(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn require_column(&self, name: &str) -> CensusResult<usize> {
        self.column_index(name)
            .ok_or_else(|| CensusError::UnknownColumn(name.to_string()))
    }

    /// Column index of the excitatory flag ("E")
    pub fn excitatory_flag(&self) -> usize {
        self.excitatory.flag
    }

    /// Column index of the inhibitory flag ("I")
    pub fn inhibitory_flag(&self) -> usize {
        self.inhibitory.flag
    }

    /// Column index of the top-level catch-all flag ("O")
    pub fn other_flag(&self) -> usize {
        self.other_flag
    }

    /// Ratio columns, inhibitory lineage first
    pub fn subtype_fractions(&self) -> &[SubtypeFraction] {
        &self.fractions
    }

    pub fn spec(&self) -> &TaxonomySpec {
        &self.spec
    }
}

fn compile_lineage(
    builder: &mut ColumnBuilder,
    spec: &LineageSpec,
    flag: usize,
    fractions: &mut Vec<SubtypeFraction>,
) -> CensusResult<CompiledLineage> {
    let column = builder.push(&spec.name, "lineage name")?;

    let mut label_paths: AHashMap<String, Vec<usize>> = AHashMap::new();
    let mut level: Vec<(&CategorySpec, Vec<usize>)> =
        spec.categories.iter().map(|c| (c, Vec::new())).collect();

    // Breadth-first so each hierarchy level occupies a contiguous run of columns
    while !level.is_empty() {
        let mut next = Vec::new();
        for (category, ancestors) in level {
            let idx = builder.push(&category.name, &format!("category of {}", spec.name))?;
            fractions.push(SubtypeFraction {
                category: category.name.clone(),
                column: idx,
                parent: column,
            });

            let mut path = ancestors;
            path.push(idx);

            if category.children.is_empty() {
                for label in &category.labels {
                    if let Some(existing) = label_paths.get(label) {
                        if *existing != path {
                            return Err(overlap_error(builder, spec, label, existing, &path));
                        }
                        continue;
                    }
                    label_paths.insert(label.clone(), path.clone());
                }
            } else {
                if !category.labels.is_empty() {
                    return Err(CensusError::MixedCategory(category.name.clone()));
                }
                next.extend(category.children.iter().map(|c| (c, path.clone())));
            }
        }
        level = next;
    }

    let other = builder.push(&spec.other, "lineage other column")?;

    Ok(CompiledLineage {
        flag,
        column,
        other,
        rule: spec.rule.clone(),
        label_paths,
    })
}

/// Locate the level where two label paths first diverge and name the two siblings
fn overlap_error(
    builder: &ColumnBuilder,
    spec: &LineageSpec,
    label: &str,
    first: &[usize],
    second: &[usize],
) -> CensusError {
    let shared = first
        .iter()
        .zip(second)
        .take_while(|(a, b)| a == b)
        .count();
    let level = match shared {
        0 => spec.name.clone(),
        n => builder.columns[first[n - 1]].clone(),
    };
    let name_at = |path: &[usize]| {
        path.get(shared)
            .map(|&i| builder.columns[i].clone())
            .unwrap_or_else(|| level.clone())
    };
    let (first, second) = (name_at(first), name_at(second));
    CensusError::OverlappingCategories {
        level,
        label: label.to_string(),
        first,
        second,
    }
}

// ============================================================================
// BUILT-IN ABC MOUSE TAXONOMY
// ============================================================================

pub const GLUT_SUFFIX: &str = "Glut";
pub const GABA_SUFFIX: &str = "Gaba";

/// Glutamatergic IT subclasses, nested under "IT"
pub const GLUT_IT_SUBCLASSES: &[(&str, &[&str])] = &[
    (
        "IT-ENT",
        &[
            "003 L5/6 IT TPE-ENT Glut",
            "008 L2/3 IT ENT Glut",
            "009 L2/3 IT PIR-ENTl Glut",
            "011 L2 IT ENT-po Glut",
        ],
    ),
    (
        "IT-CTX",
        &[
            "004 L6 IT CTX Glut",
            "005 L5 IT CTX Glut",
            "006 L4/5 IT CTX Glut",
            "007 L2/3 IT CTX Glut",
        ],
    ),
    (
        "IT-Other",
        &[
            "002 IT EP-CLA Glut",
            "010 IT AON-TT-DP Glut",
            "018 L2 IT PPP-APr Glut",
            "019 L2/3 IT PPP Glut",
            "020 L2/3 IT RSP Glut",
        ],
    ),
];

pub const GLUT_SUBCLASSES: &[(&str, &[&str])] = &[
    ("ET", &["022 L5 ET CTX Glut"]),
    (
        "CT",
        &["028 L6b/CT ENT Glut", "030 L6 CT CTX Glut", "031 CT SUB Glut"],
    ),
    (
        "NP",
        &["032 L5 NP CTX Glut", "033 NP SUB Glut", "034 NP PPP Glut"],
    ),
];

pub const GABA_SUBCLASSES: &[(&str, &[&str])] = &[
    ("Vip", &["046 Vip Gaba"]),
    ("Pvalb", &["051 Pvalb chandelier Gaba", "052 Pvalb Gaba"]),
    ("Sst", &["053 Sst Gaba", "265 PB Sst Gly-Gaba"]),
    ("Lamp5", &["049 Lamp5 Gaba", "050 Lamp5 Lhx6 Gaba"]),
    ("Sst-Chodl", &["056 Sst Chodl Gaba"]),
];

fn leaves(table: &[(&str, &[&str])]) -> Vec<CategorySpec> {
    table
        .iter()
        .map(|(name, labels)| CategorySpec::leaf(name, labels))
        .collect()
}

/// Spec of the built-in taxonomy
///
/// Excitatory cells are recognised by a class label ending in "Glut",
/// inhibitory cells by a subclass label ending in "Gaba".
pub fn abc_mouse_spec() -> TaxonomySpec {
    let mut glut = leaves(GLUT_SUBCLASSES);
    glut.push(CategorySpec::nested("IT", leaves(GLUT_IT_SUBCLASSES)));

    TaxonomySpec {
        other_flag: "O".to_string(),
        excitatory: LineageSpec {
            flag: "E".to_string(),
            name: "Glut".to_string(),
            rule: SuffixRule::new(LabelField::Class, GLUT_SUFFIX),
            categories: glut,
            other: "Glut-Other".to_string(),
        },
        inhibitory: LineageSpec {
            flag: "I".to_string(),
            name: "GABA".to_string(),
            rule: SuffixRule::new(LabelField::Subclass, GABA_SUFFIX),
            categories: leaves(GABA_SUBCLASSES),
            other: "GABA-Other".to_string(),
        },
    }
}

static ABC_MOUSE_TAXONOMY: Lazy<Taxonomy> = Lazy::new(|| {
    Taxonomy::new(abc_mouse_spec()).expect("built-in ABC mouse taxonomy failed validation")
});

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Hierarchical cell-type classification.

Each record receives one flag per taxonomy column:

1. Lineage: excitatory if the excitatory rule matches, else inhibitory if
   the inhibitory rule matches, else "O". Exactly one of E/I/O is set.
2. Within the matched lineage, the lineage column plus every named category
   whose label set contains the subclass label (a nested category sets its
   parent too).
3. The lineage's "Other" column when no named category matched.

Unrecognised labels always land in a catch-all column; classification never
fails.
*/

use crate::cell::CellRecord;
use crate::taxonomy::{CompiledLineage, Taxonomy};

/// Fixed-width set of flag columns, indexed by taxonomy column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlagSet(u64);

impl FlagSet {
    pub const CAPACITY: usize = u64::BITS as usize;

    pub const fn empty() -> Self {
        FlagSet(0)
    }

    pub fn insert(&mut self, column: usize) {
        debug_assert!(column < Self::CAPACITY);
        self.0 |= 1u64 << column;
    }

    pub fn contains(&self, column: usize) -> bool {
        column < Self::CAPACITY && self.0 & (1u64 << column) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Set columns in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (0..Self::CAPACITY).filter(move |&c| bits & (1u64 << c) != 0)
    }
}

/// A cell record paired with its flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedRecord<'a> {
    pub record: &'a CellRecord,
    pub flags: FlagSet,
}

impl ClassifiedRecord<'_> {
    /// Flag value by column name, `None` for columns outside the taxonomy
    pub fn flag(&self, taxonomy: &Taxonomy, column: &str) -> Option<bool> {
        taxonomy
            .column_index(column)
            .map(|idx| self.flags.contains(idx))
    }
}

impl CompiledLineage {
    fn mark(&self, record: &CellRecord, flags: &mut FlagSet) {
        flags.insert(self.flag);
        flags.insert(self.column);
        match self.label_paths.get(record.subclass_label.as_str()) {
            Some(path) => path.iter().for_each(|&c| flags.insert(c)),
            None => flags.insert(self.other),
        }
    }
}

impl Taxonomy {
    /// Flags for a single record
    pub fn classify_record(&self, record: &CellRecord) -> FlagSet {
        let mut flags = FlagSet::empty();
        if self.excitatory.rule.matches(record) {
            self.excitatory.mark(record, &mut flags);
        } else if self.inhibitory.rule.matches(record) {
            self.inhibitory.mark(record, &mut flags);
        } else {
            flags.insert(self.other_flag());
        }
        flags
    }

    /// Classify a record set in one pass
    pub fn classify<'a>(&self, records: &'a [CellRecord]) -> Vec<ClassifiedRecord<'a>> {
        records
            .iter()
            .map(|record| ClassifiedRecord {
                record,
                flags: self.classify_record(record),
            })
            .collect()
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Flattening of nested query results into storage rows.

A query result maps region ids to [`ResultNode`]s. A node is either a leaf
metrics row or a branch keyed by substructure (or sub-region). The variant is
fixed when the result is produced, so flattening never inspects row values.

Rows come out in input order: query result, then outer key, then inner key.
*/

use indexmap::map::IntoIter;
use indexmap::IndexMap;

use crate::row::FlatRow;

/// One node of a nested query result
#[derive(Debug, Clone, PartialEq)]
pub enum ResultNode {
    Leaf(FlatRow),
    Branch(IndexMap<String, ResultNode>),
}

impl ResultNode {
    pub fn as_leaf(&self) -> Option<&FlatRow> {
        match self {
            ResultNode::Leaf(row) => Some(row),
            ResultNode::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&IndexMap<String, ResultNode>> {
        match self {
            ResultNode::Leaf(_) => None,
            ResultNode::Branch(children) => Some(children),
        }
    }

    /// Follow a key path through branches
    pub fn get_path(&self, path: &[&str]) -> Option<&ResultNode> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self);
        };
        self.as_branch()?.get(*head)?.get_path(rest)
    }

    /// Number of leaf rows below this node
    pub fn leaf_count(&self) -> usize {
        match self {
            ResultNode::Leaf(_) => 1,
            ResultNode::Branch(children) => children.values().map(Self::leaf_count).sum(),
        }
    }
}

/// Region id -> result node, one per query run
pub type QueryResult = IndexMap<String, ResultNode>;

/// Lazy depth-first iterator over every leaf row of a result sequence
pub struct FlattenRows<I> {
    results: I,
    stack: Vec<IntoIter<String, ResultNode>>,
}

impl<I> FlattenRows<I>
where
    I: Iterator<Item = QueryResult>,
{
    pub fn new(results: I) -> Self {
        Self {
            results,
            stack: Vec::new(),
        }
    }
}

impl<I> Iterator for FlattenRows<I>
where
    I: Iterator<Item = QueryResult>,
{
    type Item = FlatRow;

    fn next(&mut self) -> Option<FlatRow> {
        loop {
            match self.stack.last_mut().map(|it| it.next()) {
                Some(Some((_, ResultNode::Leaf(row)))) => return Some(row),
                Some(Some((_, ResultNode::Branch(children)))) => {
                    self.stack.push(children.into_iter());
                }
                Some(None) => {
                    self.stack.pop();
                }
                None => {
                    let next = self.results.next()?;
                    self.stack.push(next.into_iter());
                }
            }
        }
    }
}

/// Flatten a lazy sequence of query results into rows
pub fn flatten_rows<I>(results: I) -> FlattenRows<I::IntoIter>
where
    I: IntoIterator<Item = QueryResult>,
{
    FlattenRows::new(results.into_iter())
}

/// Eager variant of [`flatten_rows`]
pub fn flatten_results<I>(results: I) -> Vec<FlatRow>
where
    I: IntoIterator<Item = QueryResult>,
{
    flatten_rows(results).collect()
}

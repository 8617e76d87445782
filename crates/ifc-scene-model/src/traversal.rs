// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Depth-bounded walk over containment and decomposition relations

use crate::{EntityId, GeometryModel};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// One visited entity and its distance from the walk root
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visit {
    pub id: EntityId,
    pub depth: usize,
}

/// Cycle-safe relationship walk
///
/// Every entity is visited at most once, keyed by identity. Entities at
/// `max_depth` are visited but not expanded.
#[derive(Clone, Copy, Debug)]
pub struct Traversal {
    max_depth: usize,
}

impl Default for Traversal {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

impl Traversal {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Depth-first pre-order walk starting at `root`
    pub fn walk(&self, model: &dyn GeometryModel, root: EntityId) -> Vec<Visit> {
        let mut visits = Vec::new();
        let mut visited = FxHashSet::default();
        let mut worklist = VecDeque::new();
        worklist.push_back(Visit { id: root, depth: 0 });

        while let Some(visit) = worklist.pop_back() {
            if !visited.insert(visit.id) {
                continue;
            }
            visits.push(visit);

            if visit.depth >= self.max_depth {
                continue;
            }
            // Reverse so the first child is popped first
            for child in model.related(visit.id).into_iter().rev() {
                if !visited.contains(&child) {
                    worklist.push_back(Visit {
                        id: child,
                        depth: visit.depth + 1,
                    });
                }
            }
        }

        visits
    }
}

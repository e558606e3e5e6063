//! Pull-driven scheduling of a chain with `&&` / `||` short-circuiting.
//!
//! The caller asks for the next runnable node, runs it, records its result
//! on the node and asks again. Nodes whose gate is closed are added to the
//! skip set and never offered.

use std::collections::BTreeSet;

use log::debug;

use super::chain::ExecutionNode;
use super::outcome::Outcome;

/// Index of the next node to run, or `None` once the chain is exhausted.
///
/// The gate for a candidate is the operator of the node just before it,
/// applied to the result of the nearest node that actually ran. Candidates
/// whose gate is closed are inserted into `skipped`. Repeated calls after
/// exhaustion keep returning `None`.
pub fn next_runnable<H>(
    nodes: &[ExecutionNode<H>],
    skipped: &mut BTreeSet<usize>,
) -> Option<usize> {
    let first = (0..nodes.len()).find(|i| !nodes[*i].has_run() && !skipped.contains(i))?;
    if first == 0 {
        return Some(0);
    }

    let mut last = nodes[..first].iter().rev().find_map(|n| n.result);
    for candidate in first..nodes.len() {
        let node = &nodes[candidate];
        if node.has_run() {
            last = node.result;
            continue;
        }
        if skipped.contains(&candidate) {
            continue;
        }
        let gate = nodes[candidate - 1].operator;
        match last {
            Some(result) if !gate.run_gate(result) => {
                debug!(
                    "skipping node {candidate} '{}': '{gate}' after exit {result}",
                    node.name()
                );
                skipped.insert(candidate);
            }
            _ => return Some(candidate),
        }
    }
    None
}

/// Owns the skip set for one run of a chain.
#[derive(Debug, Default)]
pub struct Scheduler {
    skipped: BTreeSet<usize>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next<H>(&mut self, nodes: &[ExecutionNode<H>]) -> Option<usize> {
        next_runnable(nodes, &mut self.skipped)
    }

    pub fn is_skipped(&self, index: usize) -> bool {
        self.skipped.contains(&index)
    }

    pub fn skipped(&self) -> &BTreeSet<usize> {
        &self.skipped
    }

    /// Final state of the node at `index`.
    pub fn outcome<H>(&self, nodes: &[ExecutionNode<H>], index: usize) -> Outcome {
        match nodes.get(index).and_then(|n| n.result) {
            Some(code) => Outcome::Ran(code),
            None if self.is_skipped(index) => Outcome::Skipped,
            None => Outcome::NotRun,
        }
    }
}

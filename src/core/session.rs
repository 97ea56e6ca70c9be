// This module provides IselSession, the caller-owned record of what instruction selection
// did across the functions it processed. A session is cheap to create and is meant to be
// owned by one thread; selection passes borrow it immutably and record into RefCell-guarded
// state, so a selector never needs a mutable borrow of its session. It tracks the function
// currently being selected (set by begin_function, cleared by end_function so nothing leaks
// from one function into the next) and accumulates SelectionStats: functions selected, nodes
// rewritten by patterns, nodes that arrived already selected, nodes that needed no
// selection, dead nodes tombstoned, and a per-pattern hit count. SelectionStats has a
// Display impl used by the command-line driver's --stats flag.

//! Selection session and statistics.

use hashbrown::HashMap;
use std::cell::RefCell;
use std::fmt;

/// Per-thread selection session.
#[derive(Debug, Default)]
pub struct IselSession {
    /// Accumulated statistics.
    stats: RefCell<SelectionStats>,

    /// Function currently being selected.
    current_function: RefCell<Option<String>>,
}

impl IselSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start selecting a function.
    pub fn begin_function(&self, name: &str) {
        *self.current_function.borrow_mut() = Some(name.to_string());
    }

    /// Finish the current function.
    pub fn end_function(&self) {
        if self.current_function.borrow_mut().take().is_some() {
            self.stats.borrow_mut().functions_selected += 1;
        }
    }

    /// Drop the current function after a failed selection.
    pub fn abort_function(&self) {
        if let Some(name) = self.current_function.borrow_mut().take() {
            log::debug!("Selection of {} aborted", name);
        }
    }

    pub fn current_function(&self) -> Option<String> {
        self.current_function.borrow().clone()
    }

    /// Record a node rewritten by `pattern`.
    pub fn record_pattern(&self, pattern: &'static str) {
        let mut stats = self.stats.borrow_mut();
        stats.nodes_selected += 1;
        *stats.pattern_hits.entry(pattern).or_insert(0) += 1;
    }

    /// Record a node that already carried a machine opcode.
    pub fn record_preselected(&self) {
        self.stats.borrow_mut().nodes_preselected += 1;
    }

    /// Record a node kept as is.
    pub fn record_passthrough(&self) {
        self.stats.borrow_mut().nodes_passed_through += 1;
    }

    pub fn record_dead(&self) {
        self.stats.borrow_mut().nodes_dead += 1;
    }

    /// Snapshot of the statistics.
    pub fn stats(&self) -> SelectionStats {
        self.stats.borrow().clone()
    }
}

/// Selection statistics.
#[derive(Debug, Default, Clone)]
pub struct SelectionStats {
    /// Functions run through the selector.
    pub functions_selected: usize,

    /// Nodes rewritten by a pattern.
    pub nodes_selected: usize,

    /// Nodes that arrived with a machine opcode.
    pub nodes_preselected: usize,

    /// Nodes needing no selection.
    pub nodes_passed_through: usize,

    /// Unused nodes tombstoned.
    pub nodes_dead: usize,

    /// Hits per pattern name.
    pub pattern_hits: HashMap<&'static str, usize>,
}

impl fmt::Display for SelectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Instruction Selection Statistics:")?;
        writeln!(f, "  Functions selected: {}", self.functions_selected)?;
        writeln!(f, "  Nodes selected: {}", self.nodes_selected)?;
        writeln!(f, "  Nodes pre-selected: {}", self.nodes_preselected)?;
        writeln!(f, "  Nodes passed through: {}", self.nodes_passed_through)?;
        writeln!(f, "  Dead nodes: {}", self.nodes_dead)?;

        if !self.pattern_hits.is_empty() {
            writeln!(f, "  Pattern breakdown:")?;
            let mut sorted: Vec<_> = self.pattern_hits.iter().collect();
            sorted.sort_by(|(a_name, a_count), (b_name, b_count)| {
                b_count.cmp(a_count).then(a_name.cmp(b_name))
            });

            for (pattern, count) in sorted {
                writeln!(f, "    {}: {}", pattern, count)?;
            }
        }

        Ok(())
    }
}

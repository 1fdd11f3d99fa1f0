//! Tracker tree and the opening policy applied across repeated passes.
//!
//! A test body is re-run from the top once per leaf of its execution tree.
//! Every `section!`/`generate!` call site becomes a node keyed by
//! `(name, location)` under the node that was current when the site was
//! reached. On each pass exactly one root-to-leaf path runs live (the
//! frontier); incomplete ancestors on that path are replayed, completed
//! siblings are skipped, and untried sites reached after the frontier
//! finished are deferred to a later pass.
//!
//! Replayed code runs again on later passes. Checks and early exits are
//! counted only the first time their site runs in a given round, so each
//! path contributes its results once.
//!
//! Nodes live in an arena owned by [`TrackerContext`]; parents are indices.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::core::generator::{ErasedGenerator, GeneratorCursor, downcast_cursor};
use crate::core::path::node_path;
use crate::core::types::{
    Counts, NodeKind, NodeState, PassEnd, SectionStats, SourceLocation, TrackerKey,
};
use crate::error::{TrackerError, UsageError};

/// Index of a node inside a [`TrackerContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// A node together with the generator element it held when code ran in it.
///
/// Nodes below a generator are rebuilt for every element, so a section is
/// its own round; only generators span several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Round {
    node: NodeId,
    index: usize,
}

/// Outcome of asking whether a section should run on this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// The section is on the live path; run its body.
    Enter(NodeId),
    /// The section is done, pruned, or deferred; skip its body.
    Skip,
}

/// Whether the tracker is between passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    PassInProgress,
    PassComplete,
}

enum NodeBody {
    Section,
    Generator(Box<dyn ErasedGenerator>),
}

/// One section or generator call site.
pub struct TrackerNode {
    key: TrackerKey,
    body: NodeBody,
    state: NodeState,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// A child site was reached after the frontier was claimed this pass.
    deferred_child: bool,
    /// The node is on this pass's frontier and may claim it when closed.
    live: bool,
    /// Assertion counts when the node was last entered.
    entry_assertions: Counts,
    stats: SectionStats,
}

impl TrackerNode {
    fn new(key: TrackerKey, body: NodeBody, parent: Option<NodeId>) -> Self {
        Self {
            key,
            body,
            state: NodeState::NotStarted,
            parent,
            children: Vec::new(),
            deferred_child: false,
            live: false,
            entry_assertions: Counts::default(),
            stats: SectionStats::default(),
        }
    }

    pub fn key(&self) -> &TrackerKey {
        &self.key
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::Section => NodeKind::Section,
            NodeBody::Generator(_) => NodeKind::Generator,
        }
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn stats(&self) -> &SectionStats {
        &self.stats
    }

    pub fn generator(&self) -> Option<&dyn ErasedGenerator> {
        match &self.body {
            NodeBody::Generator(generator) => Some(generator.as_ref()),
            NodeBody::Section => None,
        }
    }

    fn is_generator(&self) -> bool {
        matches!(self.body, NodeBody::Generator(_))
    }
}

/// Result of closing a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closed {
    pub node: NodeId,
    pub state: NodeState,
    /// This close was the innermost early exit of the pass.
    pub recorded_failure: bool,
}

/// What happened during one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub pass: u32,
    pub frontier_claimed: bool,
    /// Node the pass's early exit was attributed to, if any.
    pub failed_node: Option<NodeId>,
    /// Path of `failed_node`, rendered before any generator moved on.
    pub failed_path: Option<String>,
    /// The early exit replayed a round that already failed on an earlier
    /// pass.
    pub repeated_failure: bool,
    pub tree_complete: bool,
}

/// Execution tree for one test case, persisted across all of its passes.
pub struct TrackerContext {
    nodes: Vec<TrackerNode>,
    current: NodeId,
    run_state: RunState,
    frontier_claimed: bool,
    failed_node: Option<NodeId>,
    failed_path: Option<String>,
    repeated_failure: bool,
    /// Check sites counted so far, with their occurrence within a pass.
    counted_checks: HashSet<(Round, SourceLocation, u32)>,
    /// Occurrences of each check site on the current pass.
    pass_checks: HashMap<(Round, SourceLocation), u32>,
    failed_rounds: HashSet<Round>,
    pass: u32,
}

impl TrackerContext {
    /// Create a tracker whose root stands for the test case itself.
    pub fn new(root: TrackerKey) -> Self {
        Self {
            nodes: vec![TrackerNode::new(root, NodeBody::Section, None)],
            current: NodeId::ROOT,
            run_state: RunState::Idle,
            frontier_claimed: false,
            failed_node: None,
            failed_path: None,
            repeated_failure: false,
            counted_checks: HashSet::new(),
            pass_checks: HashMap::new(),
            failed_rounds: HashSet::new(),
            pass: 0,
        }
    }

    pub fn node(&self, id: NodeId) -> &TrackerNode {
        &self.nodes[id.0]
    }

    pub fn root(&self) -> &TrackerNode {
        self.node(NodeId::ROOT)
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Number of passes started so far.
    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn frontier_claimed(&self) -> bool {
        self.frontier_claimed
    }

    pub fn is_tree_complete(&self) -> bool {
        self.root().state.is_complete()
    }

    /// Begin a pass: the live path restarts at the root.
    pub fn start_pass(&mut self) -> Result<(), TrackerError> {
        if self.run_state == RunState::PassInProgress {
            return Err(UsageError::PassInProgress.into());
        }
        self.pass += 1;
        self.current = NodeId::ROOT;
        self.frontier_claimed = false;
        self.failed_node = None;
        self.failed_path = None;
        self.repeated_failure = false;
        self.pass_checks.clear();
        self.run_state = RunState::PassInProgress;

        let root = &mut self.nodes[NodeId::ROOT.0];
        if root.state == NodeState::NotStarted {
            root.state = NodeState::Open;
        }
        root.deferred_child = false;
        root.entry_assertions = root.stats.assertions;
        debug!(pass = self.pass, "pass started");
        Ok(())
    }

    /// Decide whether the section at `key` runs on this pass.
    ///
    /// On [`Visit::Enter`] the section becomes the current node and must be
    /// closed with [`TrackerContext::leave`].
    pub fn enter_section(&mut self, key: TrackerKey) -> Result<Visit, TrackerError> {
        self.ensure_in_pass()?;
        let parent = self.current;
        let id = match self.find_child(parent, &key) {
            Some(id) => {
                self.ensure_kind(id, NodeKind::Section)?;
                if self.nodes[id.0].state.is_complete() {
                    trace!(key = %key, "section already complete, skipping");
                    return Ok(Visit::Skip);
                }
                if self.frontier_claimed {
                    self.defer(parent, &key);
                    return Ok(Visit::Skip);
                }
                id
            }
            None => {
                if self.frontier_claimed {
                    self.defer(parent, &key);
                    return Ok(Visit::Skip);
                }
                self.push_child(parent, key, NodeBody::Section)
            }
        };
        self.descend(id);
        Ok(Visit::Enter(id))
    }

    /// Resolve an already-known generator site and make it current.
    ///
    /// Returns `None` when the site has not been seen under the current node;
    /// the caller then builds a cursor and hands it to
    /// [`TrackerContext::insert_generator`]. Keeping construction outside
    /// this call lets user sequence code run without the tracker borrowed.
    pub fn visit_generator(&mut self, key: &TrackerKey) -> Result<Option<NodeId>, TrackerError> {
        self.ensure_in_pass()?;
        let Some(id) = self.find_child(self.current, key) else {
            return Ok(None);
        };
        self.ensure_kind(id, NodeKind::Generator)?;
        self.descend_generator(id);
        Ok(Some(id))
    }

    /// Register a generator site seen for the first time and make it current.
    pub fn insert_generator(
        &mut self,
        key: TrackerKey,
        generator: Box<dyn ErasedGenerator>,
    ) -> Result<NodeId, TrackerError> {
        self.ensure_in_pass()?;
        if let Some(id) = self.find_child(self.current, &key) {
            self.ensure_kind(id, NodeKind::Generator)?;
            self.descend_generator(id);
            return Ok(id);
        }
        let id = self.push_child(self.current, key, NodeBody::Generator(generator));
        self.descend_generator(id);
        Ok(id)
    }

    /// Typed view of a generator node's cursor.
    pub fn cursor<T: 'static>(&self, id: NodeId) -> Result<&GeneratorCursor<T>, TrackerError> {
        let node = self.node(id);
        node.generator()
            .and_then(downcast_cursor::<T>)
            .ok_or_else(|| {
                UsageError::GeneratorTypeMismatch {
                    key: node.key.to_string(),
                    requested: std::any::type_name::<T>(),
                }
                .into()
            })
    }

    /// Close the section `id`, along with any generators opened inside it.
    pub fn leave(&mut self, id: NodeId, end: PassEnd) -> Result<Closed, TrackerError> {
        self.ensure_in_pass()?;
        if !self.is_on_live_path(id) {
            return Err(UsageError::UnbalancedLeave {
                key: self.nodes[id.0].key.to_string(),
            }
            .into());
        }
        while self.current != id {
            let inner = self.current;
            if !self.nodes[inner.0].is_generator() {
                return Err(UsageError::UnbalancedLeave {
                    key: self.nodes[id.0].key.to_string(),
                }
                .into());
            }
            self.close(inner, end);
        }
        Ok(self.close(id, end))
    }

    /// Finish the pass, closing whatever the test body left open.
    ///
    /// The root completes only on a pass that claimed no frontier: that pass
    /// proves there is nothing left to explore.
    pub fn end_pass(&mut self, end: PassEnd) -> Result<PassSummary, TrackerError> {
        self.ensure_in_pass()?;
        while self.current != NodeId::ROOT {
            let inner = self.current;
            if !self.nodes[inner.0].is_generator() {
                warn!(key = %self.nodes[inner.0].key, "section still open at end of pass");
            }
            self.close(inner, end);
        }

        if !end.is_normal() && self.failed_node.is_none() {
            self.failed_node = Some(NodeId::ROOT);
            self.failed_path = Some(node_path(self, NodeId::ROOT));
            if self.note_failure(NodeId::ROOT) {
                self.nodes[NodeId::ROOT.0].stats.failures += 1;
            }
        }

        let claimed = self.frontier_claimed;
        let root = &mut self.nodes[NodeId::ROOT.0];
        root.stats.runs += 1;
        if !claimed {
            if root.deferred_child {
                warn!("deferred site on a pass that claimed nothing");
            }
            root.state = if end.is_normal() {
                NodeState::Completed
            } else {
                NodeState::CompletedWithFailure
            };
        }
        self.run_state = RunState::PassComplete;

        let summary = PassSummary {
            pass: self.pass,
            frontier_claimed: claimed,
            failed_node: self.failed_node,
            failed_path: self.failed_path.clone(),
            repeated_failure: self.repeated_failure,
            tree_complete: self.is_tree_complete(),
        };
        debug!(
            pass = summary.pass,
            claimed = summary.frontier_claimed,
            failed = summary.failed_node.is_some(),
            complete = summary.tree_complete,
            "pass finished"
        );
        Ok(summary)
    }

    /// Count a check at `location` against the innermost section.
    ///
    /// Returns `false`, counting nothing, when the same check already ran in
    /// the current round on an earlier pass.
    pub fn record_assertion(&mut self, passed: bool, location: SourceLocation) -> bool {
        let round = self.round(self.current);
        let seen = self.pass_checks.entry((round, location)).or_insert(0);
        let occurrence = *seen;
        *seen += 1;
        if !self.counted_checks.insert((round, location, occurrence)) {
            trace!(%location, occurrence, "check replayed, not counted");
            return false;
        }

        let id = self.current_section();
        let counts = &mut self.nodes[id.0].stats.assertions;
        if passed {
            counts.passed += 1;
        } else {
            counts.failed += 1;
        }
        true
    }

    /// Nearest section at or above the current node.
    pub fn current_section(&self) -> NodeId {
        let mut id = self.current;
        while self.nodes[id.0].is_generator() {
            match self.nodes[id.0].parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        id
    }

    /// Assertions recorded on `id` since it was last entered.
    pub fn assertions_since_entry(&self, id: NodeId) -> Counts {
        let node = self.node(id);
        node.stats.assertions - node.entry_assertions
    }

    /// Add body time measured by a section guard.
    pub fn add_elapsed(&mut self, id: NodeId, elapsed: std::time::Duration) {
        self.nodes[id.0].stats.elapsed += elapsed;
    }

    /// Depth-first walk of all nodes reachable from the root, root excluded.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.root().children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    fn round(&self, id: NodeId) -> Round {
        Round {
            node: id,
            index: self.nodes[id.0]
                .generator()
                .map_or(0, |generator| generator.current_index()),
        }
    }

    /// Remember that `id` ended the pass early; `false` when its round
    /// already failed before.
    fn note_failure(&mut self, id: NodeId) -> bool {
        let round = self.round(id);
        let first = self.failed_rounds.insert(round);
        if !first {
            debug!(key = %self.nodes[id.0].key, "failure replayed, not reported again");
        }
        self.repeated_failure = !first;
        first
    }

    fn ensure_in_pass(&self) -> Result<(), TrackerError> {
        if self.run_state != RunState::PassInProgress {
            return Err(UsageError::NoPassInProgress.into());
        }
        Ok(())
    }

    fn ensure_kind(&self, id: NodeId, requested: NodeKind) -> Result<(), TrackerError> {
        let node = &self.nodes[id.0];
        let recorded = node.kind();
        if recorded != requested {
            return Err(UsageError::KindMismatch {
                key: node.key.to_string(),
                recorded,
                requested,
            }
            .into());
        }
        Ok(())
    }

    fn find_child(&self, parent: NodeId, key: &TrackerKey) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].key == *key)
    }

    fn push_child(&mut self, parent: NodeId, key: TrackerKey, body: NodeBody) -> NodeId {
        let id = NodeId(self.nodes.len());
        trace!(key = %key, parent = parent.0, "discovered node");
        self.nodes.push(TrackerNode::new(key, body, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn defer(&mut self, parent: NodeId, key: &TrackerKey) {
        trace!(key = %key, "frontier already claimed, deferring");
        self.nodes[parent.0].deferred_child = true;
    }

    fn descend(&mut self, id: NodeId) {
        let parent = self.current;
        if self.nodes[parent.0].state == NodeState::Open {
            self.nodes[parent.0].state = NodeState::ExecutingChildren;
        }
        let node = &mut self.nodes[id.0];
        if node.state == NodeState::NotStarted {
            node.state = NodeState::Open;
            node.live = true;
            debug!(key = %node.key, "opened");
        }
        node.deferred_child = false;
        node.entry_assertions = node.stats.assertions;
        self.current = id;
    }

    /// Generators always become current so that later sites in the same
    /// scope resolve beneath them; only a generator on the frontier is live.
    fn descend_generator(&mut self, id: NodeId) {
        let parent = self.current;
        let state = self.nodes[id.0].state;
        let live = !state.is_complete() && !self.frontier_claimed;
        if !state.is_complete() && self.frontier_claimed {
            let key = self.nodes[id.0].key.clone();
            self.defer(parent, &key);
        }
        if self.nodes[parent.0].state == NodeState::Open {
            self.nodes[parent.0].state = NodeState::ExecutingChildren;
        }
        let node = &mut self.nodes[id.0];
        if live {
            if node.state == NodeState::NotStarted {
                node.state = NodeState::Open;
            }
            node.live = true;
        }
        node.deferred_child = false;
        node.entry_assertions = node.stats.assertions;
        self.current = id;
    }

    fn is_on_live_path(&self, id: NodeId) -> bool {
        let mut cursor = Some(self.current);
        while let Some(node) = cursor {
            if node == id {
                return true;
            }
            cursor = self.nodes[node.0].parent;
        }
        false
    }

    fn children_done(&self, id: NodeId) -> bool {
        let node = &self.nodes[id.0];
        !node.deferred_child
            && node
                .children
                .iter()
                .all(|child| self.nodes[child.0].state.is_complete())
    }

    /// Apply the state transition for leaving `id` and pop it off the live
    /// path. `id` must be the current node.
    fn close(&mut self, id: NodeId, end: PassEnd) -> Closed {
        let done = self.children_done(id);
        let innermost_failure = !end.is_normal() && self.failed_node.is_none();
        let mut first_failure = false;
        if innermost_failure {
            self.failed_path = Some(node_path(self, id));
            first_failure = self.note_failure(id);
        }
        let node = &mut self.nodes[id.0];
        let was_live = node.live;
        let before = node.state;
        node.live = false;
        node.stats.runs += 1;

        let mut claims = was_live;
        if innermost_failure {
            if first_failure {
                node.stats.failures += 1;
            }
            self.failed_node = Some(id);
            if node.is_generator() {
                if was_live {
                    self.finish_round(id);
                }
            } else {
                node.state = NodeState::CompletedWithFailure;
                claims = true;
            }
            debug!(key = %self.nodes[id.0].key, "ended early");
        } else if !end.is_normal() {
            // An inner node failed: the rest of this body never ran, so the
            // node stays open and is replayed to reach its later sites.
        } else if node.is_generator() {
            if was_live && done {
                self.finish_round(id);
            }
        } else if done && node.state.is_open() {
            node.state = NodeState::Completed;
        }

        if claims && !self.frontier_claimed {
            trace!(key = %self.nodes[id.0].key, "frontier claimed");
            self.frontier_claimed = true;
        }

        let node = &self.nodes[id.0];
        if node.state != before {
            debug!(key = %node.key, from = ?before, to = ?node.state, "state changed");
        }
        self.current = node.parent.unwrap_or(NodeId::ROOT);
        Closed {
            node: id,
            state: node.state,
            recorded_failure: innermost_failure,
        }
    }

    /// End a generator's value round: move to the next element and forget
    /// the round's children, or complete the node when the sequence is done.
    fn finish_round(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        let NodeBody::Generator(generator) = &mut node.body else {
            return;
        };
        if generator.advance() {
            node.children.clear();
            node.deferred_child = false;
            node.state = NodeState::Open;
            debug!(key = %node.key, index = generator.current_index(), "generator advanced");
        } else {
            node.state = NodeState::Completed;
            debug!(key = %node.key, "generator exhausted");
        }
    }
}

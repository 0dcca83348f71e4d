//! Incremental relayout of changing syntax trees.
//!
//! The [`DiagramController`] owns the layout engine, the router and the
//! arrangement cache. Snapshots are [`submit`](DiagramController::submit)ted
//! as they arrive and laid out when [`process`](DiagramController::process)
//! runs; bursts collapse to the latest snapshot. Each pass diffs the new tree
//! against the last one that laid out successfully, drops the cached
//! arrangements the patches touch and reuses the rest.
//!
//! The published diagram is only replaced after a pass fully succeeds. A
//! failing pass leaves the published diagram, the last tree and the cache
//! as they were.

mod diff;

pub use diff::{Patch, diff};

use std::{collections::HashMap, rc::Rc};

use log::{debug, info, warn};

use trellis_core::{identifier::Id, syntax::SyntaxTree};

use crate::{
    config::LayoutConfig,
    error::{ConfigurationError, TrellisError},
    layout::{ArrangementCache, Engine},
    routing::{RoutedDiagram, Router},
};

/// Outcome of a successful pass.
#[derive(Debug, Clone)]
pub struct LayoutUpdate {
    generation: u64,
    patches: Vec<Patch>,
    reused: usize,
    recomputed: usize,
    diagram: Rc<RoutedDiagram>,
}

impl LayoutUpdate {
    /// Number of successful passes so far, this one included.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Subtrees taken from the cache.
    pub fn reused(&self) -> usize {
        self.reused
    }

    /// Nodes measured during the pass.
    pub fn recomputed(&self) -> usize {
        self.recomputed
    }

    pub fn diagram(&self) -> &Rc<RoutedDiagram> {
        &self.diagram
    }
}

/// Turns a stream of tree snapshots into published diagrams.
#[derive(Debug)]
pub struct DiagramController {
    engine: Engine,
    router: Router,
    cache: ArrangementCache,
    last_tree: Option<SyntaxTree>,
    published: Option<Rc<RoutedDiagram>>,
    pending: Option<SyntaxTree>,
    generation: u64,
    superseded: usize,
}

impl DiagramController {
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the layout configuration is
    /// unusable.
    pub fn new(config: LayoutConfig) -> Result<Self, ConfigurationError> {
        let router = Router::new(&config);
        Ok(Self {
            engine: Engine::new(config)?,
            router,
            cache: ArrangementCache::new(),
            last_tree: None,
            published: None,
            pending: None,
            generation: 0,
            superseded: 0,
        })
    }

    /// Queues `tree` for the next pass, replacing any snapshot still
    /// waiting.
    pub fn submit(&mut self, tree: SyntaxTree) {
        if self.pending.replace(tree).is_some() {
            self.superseded += 1;
            debug!(superseded = self.superseded; "Dropped superseded snapshot");
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Snapshots replaced before they were processed.
    pub fn superseded(&self) -> usize {
        self.superseded
    }

    /// The diagram of the last successful pass.
    pub fn current(&self) -> Option<Rc<RoutedDiagram>> {
        self.published.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of cached arrangements.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Lays out the pending snapshot, if there is one.
    ///
    /// # Errors
    ///
    /// Returns the structural or consistency error of a failed pass. The
    /// failed snapshot is discarded and the published diagram is kept.
    pub fn process(&mut self) -> Result<Option<LayoutUpdate>, TrellisError> {
        let Some(tree) = self.pending.take() else {
            return Ok(None);
        };

        let empty = SyntaxTree::new();
        let previous = self.last_tree.as_ref().unwrap_or(&empty);
        let patches = diff(previous, &tree);
        info!(
            generation = self.generation + 1,
            patches = patches.len();
            "Processing snapshot"
        );

        let mut cache = self.cache.clone();
        let evicted = invalidate(&mut cache, previous, &tree, &patches);
        cache.reset_counters();

        let routed = self
            .engine
            .layout_cached(&tree, &mut cache)
            .and_then(|diagram| self.router.route(diagram).map_err(TrellisError::from))
            .inspect_err(|err| warn!(err:%; "Snapshot rejected, keeping published diagram"))?;

        let diagram = Rc::new(routed);
        self.generation += 1;
        let update = LayoutUpdate {
            generation: self.generation,
            patches,
            reused: cache.hits(),
            recomputed: cache.misses(),
            diagram: Rc::clone(&diagram),
        };
        debug!(
            generation = update.generation,
            evicted,
            reused = update.reused,
            recomputed = update.recomputed;
            "Published diagram"
        );

        self.cache = cache;
        self.last_tree = Some(tree);
        self.published = Some(diagram);
        Ok(Some(update))
    }
}

/// Evicts every cached arrangement a patch can affect. Returns the number of
/// evicted entries.
fn invalidate(
    cache: &mut ArrangementCache,
    old: &SyntaxTree,
    new: &SyntaxTree,
    patches: &[Patch],
) -> usize {
    let new_parents = parent_ids(new);
    let old_parents = parent_ids(old);
    let mut evicted = 0;
    let mut evict_chain = |cache: &mut ArrangementCache, start: Option<Id>| {
        let mut current = start;
        while let Some(id) = current {
            evicted += usize::from(cache.invalidate(id));
            current = new_parents.get(&id).copied();
        }
    };

    for patch in patches {
        match patch {
            Patch::Update { id } | Patch::Restructure { id } => evict_chain(cache, Some(*id)),
            Patch::Insert { parent, .. } => evict_chain(cache, *parent),
            Patch::Remove { id } => {
                evict_chain(cache, Some(*id));
                evict_chain(cache, old_parents.get(id).copied());
            }
            Patch::Move { from, to, .. } => {
                evict_chain(cache, *from);
                evict_chain(cache, *to);
            }
        }
    }
    evicted
}

fn parent_ids(tree: &SyntaxTree) -> HashMap<Id, Id> {
    tree.parents()
        .into_iter()
        .filter_map(|(child, parent)| Some((tree.get(child)?.id(), tree.get(parent)?.id())))
        .collect()
}

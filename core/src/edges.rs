//! Edge Table
//!
//! Latest known accumulator root of every linked remote anchor. After a
//! sync the table follows the ledger's edge-list order, which is the order
//! the roots appear in a proof's public inputs. Chains linked locally but
//! absent from the ledger's view keep their relative order at the end.

use serde::{Deserialize, Serialize};
use tracing::debug;
use vanchor_privacy::Element;

use crate::error::{AnchorError, AnchorResult};

/// A neighbor's latest root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Typed chain id of the neighbor (`TypedChainId::as_u64`)
    pub source_chain_id: u64,
    pub root: Element,
    pub latest_leaf_index: u32,
}

#[derive(Debug, Clone)]
pub struct EdgeTable {
    max_edges: usize,
    edges: Vec<Edge>,
}

impl EdgeTable {
    pub fn new(max_edges: usize) -> Self {
        Self {
            max_edges,
            edges: Vec::with_capacity(max_edges),
        }
    }

    pub fn max_edges(&self) -> usize {
        self.max_edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Register a neighbor chain with an empty root. Linking twice is a no-op.
    pub fn link(&mut self, source_chain_id: u64, empty_root: Element) -> AnchorResult<()> {
        if self.position(source_chain_id).is_some() {
            return Ok(());
        }
        if self.edges.len() >= self.max_edges {
            return Err(AnchorError::EdgeCapacityExceeded { max: self.max_edges });
        }
        self.edges.push(Edge {
            source_chain_id,
            root: empty_root,
            latest_leaf_index: 0,
        });
        debug!("Linked edge for chain {:#x}", source_chain_id);
        Ok(())
    }

    pub fn get(&self, source_chain_id: u64) -> AnchorResult<&Edge> {
        self.position(source_chain_id)
            .map(|i| &self.edges[i])
            .ok_or(AnchorError::UnknownEdge(source_chain_id))
    }

    /// Apply a neighbor update.
    ///
    /// Returns `false` when the update is older than what is already held.
    pub fn update(&mut self, edge: Edge) -> AnchorResult<bool> {
        let i = self
            .position(edge.source_chain_id)
            .ok_or(AnchorError::UnknownEdge(edge.source_chain_id))?;
        let current = &mut self.edges[i];
        if edge.latest_leaf_index < current.latest_leaf_index {
            debug!(
                "Ignoring stale edge for chain {:#x}: leaf {} < {}",
                edge.source_chain_id, edge.latest_leaf_index, current.latest_leaf_index
            );
            return Ok(false);
        }
        *current = edge;
        Ok(true)
    }

    /// Merge the ledger's view of the neighbors, linking chains seen for the
    /// first time and adopting the ledger's ordering
    pub fn sync(&mut self, edges: &[Edge], empty_root: Element) -> AnchorResult<()> {
        for edge in edges {
            self.link(edge.source_chain_id, empty_root)?;
            self.update(*edge)?;
        }
        let rank = |chain: u64| {
            edges
                .iter()
                .position(|e| e.source_chain_id == chain)
                .unwrap_or(usize::MAX)
        };
        self.edges.sort_by_key(|e| rank(e.source_chain_id));
        Ok(())
    }

    /// `[local_root, edge roots...]` padded with `empty_root` to `max_edges + 1`
    pub fn roots_for_proof(&self, local_root: Element, empty_root: Element) -> Vec<Element> {
        let mut roots = Vec::with_capacity(self.max_edges + 1);
        roots.push(local_root);
        roots.extend(self.edges.iter().map(|e| e.root));
        roots.resize(self.max_edges + 1, empty_root);
        roots
    }

    fn position(&self, source_chain_id: u64) -> Option<usize> {
        self.edges.iter().position(|e| e.source_chain_id == source_chain_id)
    }
}

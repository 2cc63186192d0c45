//! Frontier expansion over a [`GraphStore`].
//!
//! The visited set is keyed by relationship id, not by node, so parallel edges
//! between the same pair of nodes are each collected and cycles terminate once
//! every edge on them has been crossed.

use std::collections::HashSet;

use store::{Direction, GraphNode, GraphStore, Relationship, StoreError};

fn element_ids(nodes: &[GraphNode]) -> Vec<String> {
    let mut seen = HashSet::new();
    nodes
        .iter()
        .filter(|n| seen.insert(n.element_id.clone()))
        .map(|n| n.element_id.clone())
        .collect()
}

/// Every relationship on any directed path of length >= 1 leaving
/// (`Outbound`) or entering (`Inbound`) the anchors, in discovery order.
pub async fn traverse(
    store: &dyn GraphStore,
    anchors: &[GraphNode],
    direction: Direction,
) -> Result<Vec<Relationship>, StoreError> {
    let mut frontier = element_ids(anchors);
    // Expanding a node twice only yields edges already visited.
    let mut expanded: HashSet<String> = frontier.iter().cloned().collect();
    let mut visited_edges: HashSet<String> = HashSet::new();
    let mut found = Vec::new();

    while !frontier.is_empty() {
        let edges = store.expand(&frontier, direction).await?;
        let mut next = Vec::new();

        for edge in edges {
            if !visited_edges.insert(edge.rel_id) {
                continue;
            }

            let far = match direction {
                Direction::Outbound => &edge.relationship.target,
                Direction::Inbound => &edge.relationship.source,
            };
            if expanded.insert(far.element_id.clone()) {
                next.push(far.element_id.clone());
            }

            found.push(edge.relationship);
        }

        frontier = next;
    }

    Ok(found)
}

/// First node with an `id` reachable by exactly two forward hops from an
/// anchor, never crossing the same relationship twice.
///
/// Grand nodes without an `id` are skipped rather than ending the search, so
/// a later named grand node is still reported.
pub async fn find_grandparent(
    store: &dyn GraphStore,
    anchors: &[GraphNode],
) -> Result<Option<String>, StoreError> {
    let first_hop = store.expand(&element_ids(anchors), Direction::Outbound).await?;
    if first_hop.is_empty() {
        return Ok(None);
    }

    let middles: Vec<GraphNode> = first_hop
        .iter()
        .map(|e| e.relationship.target.clone())
        .collect();
    let second_hop = store.expand(&element_ids(&middles), Direction::Outbound).await?;

    for second in &second_hop {
        let reachable = first_hop.iter().any(|first| {
            first.relationship.target.element_id == second.relationship.source.element_id
                && first.rel_id != second.rel_id
        });
        if !reachable {
            continue;
        }
        if let Some(id) = &second.relationship.target.id {
            return Ok(Some(id.clone()));
        }
    }

    Ok(None)
}

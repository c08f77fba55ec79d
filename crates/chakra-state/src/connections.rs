//! Proximity connections between squares of a circle and circles of a panel.
//!
//! Connections live in an undirected `GraphMap` keyed by entity id, so the
//! pair (A, B) and the pair (B, A) address the same edge and recomputing a
//! pair rewrites its existing record instead of adding a second one.

use crate::events::StoreEvent;
use crate::store::EntityStore;
use chakra_core::geometry::{measure, unordered_pairs};
use chakra_core::id::{EntityId, PanelId};
use chakra_core::model::Connection;
use chakra_core::Point;
use petgraph::graphmap::UnGraphMap;
use std::cmp::Ordering;

#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    graph: UnGraphMap<EntityId, Connection>,
}

impl ConnectionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `fresh`, or refresh the geometry of the existing record for
    /// the same pair. The highlight flag of an existing record is kept.
    pub fn upsert(&mut self, fresh: Connection) {
        let (a, b) = (fresh.source_id, fresh.target_id);
        if let Some(existing) = self.graph.edge_weight_mut(a, b) {
            existing.length = fresh.length;
            existing.is_visible = fresh.is_visible;
        } else {
            self.graph.add_edge(a, b, fresh);
        }
    }

    pub fn get(&self, a: EntityId, b: EntityId) -> Option<&Connection> {
        self.graph.edge_weight(a, b)
    }

    /// Connections with `id` as an endpoint.
    pub fn touching(&self, id: EntityId) -> impl Iterator<Item = &Connection> + '_ {
        self.graph
            .contains_node(id)
            .then(|| self.graph.edges(id).map(|(_, _, c)| c))
            .into_iter()
            .flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> + '_ {
        self.graph.all_edges().map(|(_, _, c)| c)
    }

    /// Drop an endpoint together with all its connections.
    pub fn remove_node(&mut self, id: EntityId) -> bool {
        self.graph.remove_node(id)
    }

    /// Clear the highlight on every connection touching `id`.
    pub fn clear_highlights(&mut self, id: EntityId) {
        let others: Vec<EntityId> = self
            .touching(id)
            .filter_map(|c| c.other_end(id))
            .collect();
        for other in others {
            if let Some(conn) = self.graph.edge_weight_mut(id, other) {
                conn.is_highlighted = false;
            }
        }
    }

    /// Highlight the shortest visible connection touching `id` and return
    /// its other endpoint. Ties go to the smaller endpoint id.
    pub fn highlight_closest(&mut self, id: EntityId) -> Option<EntityId> {
        self.clear_highlights(id);
        let closest = self
            .touching(id)
            .filter(|c| c.is_visible)
            .filter_map(|c| c.other_end(id).map(|other| (c.length, other)))
            .min_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.1.cmp(&b.1))
            })
            .map(|(_, other)| other)?;
        if let Some(conn) = self.graph.edge_weight_mut(id, closest) {
            conn.is_highlighted = true;
        }
        Some(closest)
    }

    pub fn len(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    pub fn clear(&mut self) {
        self.graph.clear();
    }
}

impl EntityStore {
    /// Recompute every square↔square connection of `circle_id`.
    ///
    /// Only visible squares are paired. The shortest visible connection
    /// touching the circle's "Me" square is highlighted and the other
    /// endpoint's name is written to `closest_square_name`. Returns the
    /// number of connections of the circle.
    pub fn recompute_connections(&mut self, circle_id: EntityId) -> usize {
        if !self.circles.contains(circle_id) {
            return 0;
        }
        let max = self.config.max_line_length;

        let mut visible: Vec<(EntityId, Point)> = Vec::new();
        let mut hidden: Vec<EntityId> = Vec::new();
        let mut me: Option<EntityId> = None;
        for square in self.squares.iter().filter(|s| s.circle_id == circle_id) {
            if square.visible {
                visible.push((square.id, square.position()));
                if square.is_me {
                    me = Some(square.id);
                }
            } else {
                hidden.push(square.id);
            }
        }

        for id in hidden {
            self.square_links.remove_node(id);
        }
        for (a, b) in unordered_pairs(&visible) {
            self.square_links.upsert(measure(a, b, max));
        }

        let closest_name = me
            .and_then(|me| self.square_links.highlight_closest(me))
            .and_then(|other| self.squares.get(other))
            .map(|square| square.name.clone());
        if let Some(circle) = self.circles.get_mut(circle_id) {
            circle.closest_square_name = closest_name.clone();
        }

        let count = visible.len() * visible.len().saturating_sub(1) / 2;
        log::trace!("recomputed {count} connections for circle {circle_id}");
        self.emit(StoreEvent::ConnectionUpdated {
            owner_id: circle_id.to_string(),
            connections: count,
            closest_square_name: closest_name,
        });
        count
    }

    /// Recompute every circle↔circle connection among the visible circles
    /// of `panel`. Returns the number of connections.
    pub fn recompute_circle_connections(&mut self, panel: PanelId) -> usize {
        let max = self.config.max_line_length;

        let mut visible: Vec<(EntityId, Point)> = Vec::new();
        let mut hidden: Vec<EntityId> = Vec::new();
        for circle in self.circles.iter().filter(|c| c.circle_type == panel) {
            if circle.visible {
                visible.push((circle.id, circle.position()));
            } else {
                hidden.push(circle.id);
            }
        }

        for id in hidden {
            self.circle_links.remove_node(id);
        }
        for (a, b) in unordered_pairs(&visible) {
            self.circle_links.upsert(measure(a, b, max));
        }

        let count = visible.len() * visible.len().saturating_sub(1) / 2;
        log::trace!("recomputed {count} circle connections for panel {panel}");
        self.emit(StoreEvent::ConnectionUpdated {
            owner_id: panel.to_string(),
            connections: count,
            closest_square_name: None,
        });
        count
    }

    /// Drop the transient connections of a circle's squares.
    pub(crate) fn clear_connections(&mut self, circle_id: EntityId) {
        for id in self.squares.ids_where(|s| s.circle_id == circle_id) {
            self.square_links.remove_node(id);
        }
        if let Some(circle) = self.circles.get_mut(circle_id) {
            circle.closest_square_name = None;
        }
        self.emit(StoreEvent::ConnectionUpdated {
            owner_id: circle_id.to_string(),
            connections: 0,
            closest_square_name: None,
        });
    }

    /// The connection between two squares, or between two circles.
    pub fn connection(&self, a: EntityId, b: EntityId) -> Option<&Connection> {
        self.square_links
            .get(a, b)
            .or_else(|| self.circle_links.get(a, b))
    }

    /// Connections among the squares of `circle_id`.
    pub fn connections_for_circle(&self, circle_id: EntityId) -> Vec<&Connection> {
        self.square_links
            .iter()
            .filter(|c| {
                self.squares
                    .get(c.source_id)
                    .is_some_and(|s| s.circle_id == circle_id)
            })
            .collect()
    }

    /// Connections among the circles of `panel`.
    pub fn circle_connections_for_panel(&self, panel: PanelId) -> Vec<&Connection> {
        self.circle_links
            .iter()
            .filter(|c| {
                self.circles
                    .get(c.source_id)
                    .is_some_and(|circle| circle.circle_type == panel)
            })
            .collect()
    }
}

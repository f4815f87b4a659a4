use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::{debug, warn};

use super::types::CanvasData;

pub const NODE_RADIUS: f64 = 5.0;
pub const HIT_RADIUS: f64 = 12.0;
/// Pointer travel (screen px) below which a press counts as a click.
pub const CLICK_SLOP: f64 = 4.0;

#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub label: String,
	pub color: String,
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<DefaultNodeIdx>,
	pub neighbors: HashSet<DefaultNodeIdx>,
	pub highlight_t: f64,
	pub prev_node: Option<DefaultNodeIdx>,
	pub prev_neighbors: HashSet<DefaultNodeIdx>,
	delay_t: f64,
}

pub struct ForceGraphState {
	pub graph: ForceGraph<NodeInfo, ()>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub selected: Option<DefaultNodeIdx>,
	pub width: f64,
	pub height: f64,
	pub animation_running: bool,
	pub flow_time: f64,
	edges: Vec<(DefaultNodeIdx, DefaultNodeIdx)>,
	edge_labels: HashMap<(DefaultNodeIdx, DefaultNodeIdx), String>,
	ids: HashMap<DefaultNodeIdx, String>,
}

fn simulation() -> ForceGraph<NodeInfo, ()> {
	ForceGraph::new(SimulationParameters {
		force_charge: 150.0,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	})
}

impl ForceGraphState {
	pub fn new(data: &CanvasData, width: f64, height: f64) -> Self {
		let mut state = Self {
			graph: simulation(),
			edges: Vec::new(),
			edge_labels: HashMap::new(),
			ids: HashMap::new(),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			selected: None,
			width,
			height,
			animation_running: true,
			flow_time: 0.0,
		};
		state.sync(data);
		state
	}

	/// Rebuilds the simulation from `data`. Nodes that survive keep their
	/// position and pin; new ones are seeded on a ring. Links whose source or
	/// target is unknown are skipped.
	pub fn sync(&mut self, data: &CanvasData) {
		let mut previous: HashMap<String, (f32, f32, bool)> = HashMap::new();
		self.graph.visit_nodes(|node| {
			if let Some(id) = self.ids.get(&node.index()) {
				previous.insert(id.clone(), (node.x(), node.y(), node.data.is_anchor));
			}
		});
		let selected_id = self.selected.and_then(|idx| self.ids.get(&idx).cloned());

		let mut graph = simulation();
		let mut id_to_idx = HashMap::new();
		let mut ids = HashMap::new();
		let mut edges = Vec::new();
		let mut edge_labels = HashMap::new();
		let count = data.nodes.len().max(1) as f64;

		for (i, node) in data.nodes.iter().enumerate() {
			let (x, y, is_anchor) = previous.get(&node.id).copied().unwrap_or_else(|| {
				// ring in graph space, centred on the origin the view is translated to
				let angle = (i as f64) * 2.0 * PI / count;
				((100.0 * angle.cos()) as f32, (100.0 * angle.sin()) as f32, false)
			});
			let idx = graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor,
				user_data: NodeInfo {
					label: node.label.clone(),
					color: node.color.clone(),
				},
			});
			id_to_idx.insert(node.id.clone(), idx);
			ids.insert(idx, node.id.clone());
		}

		let mut dropped = 0;
		for link in &data.links {
			if let (Some(&src), Some(&tgt)) =
				(id_to_idx.get(&link.source), id_to_idx.get(&link.target))
			{
				graph.add_edge(src, tgt, EdgeData::default());
				edges.push((src, tgt));
				if !link.label.is_empty() {
					// parallel relations share one label, joined in link order
					let label: &mut String = edge_labels.entry((src, tgt)).or_default();
					if !label.split(", ").any(|l| l == link.label) {
						if !label.is_empty() {
							label.push_str(", ");
						}
						label.push_str(&link.label);
					}
				}
			} else {
				dropped += 1;
			}
		}
		if dropped > 0 {
			warn!("skipped {dropped} link(s) with a missing endpoint");
		}
		self.graph = graph;
		self.edges = edges;
		self.edge_labels = edge_labels;
		self.selected = selected_id.and_then(|id| id_to_idx.get(&id).copied());
		self.ids = ids;
		self.drag = DragState::default();
		self.hover = HoverState::default();
		debug!("canvas synced: {} nodes, {} links", self.node_count(), self.link_count());
	}

	pub fn node_id(&self, idx: DefaultNodeIdx) -> Option<&str> {
		self.ids.get(&idx).map(String::as_str)
	}

	/// Relation type drawn along the link from `src` to `tgt`.
	pub fn edge_label(&self, src: DefaultNodeIdx, tgt: DefaultNodeIdx) -> Option<&str> {
		self.edge_labels.get(&(src, tgt)).map(String::as_str)
	}

	pub fn select(&mut self, id: Option<&str>) {
		self.selected = id.and_then(|id| {
			self.ids
				.iter()
				.find_map(|(idx, node_id)| (node_id == id).then_some(*idx))
		});
	}

	pub fn node_count(&self) -> usize {
		self.ids.len()
	}

	pub fn link_count(&self) -> usize {
		self.edges.len()
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			// HIT_RADIUS is in world-space, scales with zoom like nodes
			if (dx * dx + dy * dy).sqrt() < HIT_RADIUS {
				found = Some(node.index());
			}
		});
		found
	}

	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Save previous state for fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(idx) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for &(src, tgt) in &self.edges {
				if src == idx {
					self.hover.neighbors.insert(tgt);
				} else if tgt == idx {
					self.hover.neighbors.insert(src);
				}
			}
		}
	}

	pub fn is_highlighted(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn tick(&mut self, dt: f32) {
		self.graph.update(dt);
		self.flow_time += dt as f64;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt as f64).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::types::{CanvasLink, CanvasNode};

	fn data(nodes: &[&str], links: &[(&str, &str)]) -> CanvasData {
		CanvasData {
			nodes: nodes
				.iter()
				.map(|id| CanvasNode {
					id: (*id).into(),
					label: id.to_uppercase(),
					color: "#1f77b4".into(),
				})
				.collect(),
			links: links
				.iter()
				.map(|(s, t)| CanvasLink {
					source: (*s).into(),
					target: (*t).into(),
					label: "calls".into(),
				})
				.collect(),
		}
	}

	fn position(state: &ForceGraphState, id: &str) -> Option<(f32, f32)> {
		let mut found = None;
		state.graph.visit_nodes(|node| {
			if state.node_id(node.index()) == Some(id) {
				found = Some((node.x(), node.y()));
			}
		});
		found
	}

	#[test]
	fn dangling_links_are_dropped() {
		let state = ForceGraphState::new(&data(&["a", "b"], &[("a", "b"), ("a", "ghost")]), 800.0, 600.0);
		assert_eq!(state.node_count(), 2);
		assert_eq!(state.link_count(), 1);
	}

	#[test]
	fn link_labels_follow_their_endpoints() {
		let state = ForceGraphState::new(&data(&["a", "b"], &[("a", "b")]), 800.0, 600.0);
		let (mut a, mut b) = (None, None);
		state.graph.visit_nodes(|node| match state.node_id(node.index()) {
			Some("a") => a = Some(node.index()),
			Some("b") => b = Some(node.index()),
			_ => {}
		});
		let (a, b) = (a.unwrap(), b.unwrap());
		assert_eq!(state.edge_label(a, b), Some("calls"));
		assert_eq!(state.edge_label(b, a), None);
	}

	#[test]
	fn parallel_links_share_a_joined_label() {
		let mut input = data(&["a", "b"], &[("a", "b"), ("a", "b"), ("a", "b")]);
		input.links[1].label = "imports".into();
		let state = ForceGraphState::new(&input, 800.0, 600.0);
		let mut ends = Vec::new();
		state.graph.visit_nodes(|node| ends.push((state.node_id(node.index()) == Some("a"), node.index())));
		let a = ends.iter().find(|(is_a, _)| *is_a).unwrap().1;
		let b = ends.iter().find(|(is_a, _)| !*is_a).unwrap().1;
		assert_eq!(state.edge_label(a, b), Some("calls, imports"));
	}

	#[test]
	fn sync_keeps_positions_and_selection() {
		let mut state = ForceGraphState::new(&data(&["a", "b"], &[("a", "b")]), 800.0, 600.0);
		state.tick(0.016);
		state.select(Some("b"));
		let before = position(&state, "b").unwrap();

		state.sync(&data(&["b", "c"], &[("b", "c")]));
		assert_eq!(position(&state, "b"), Some(before));
		assert!(position(&state, "a").is_none());
		assert_eq!(state.selected.and_then(|idx| state.node_id(idx)), Some("b"));
	}

	#[test]
	fn hit_test_finds_node_under_pointer() {
		let state = ForceGraphState::new(&data(&["only"], &[]), 800.0, 600.0);
		// single node sits at angle 0 on the ring, 100 units right of centre
		let idx = state.node_at_position(500.0, 300.0).unwrap();
		assert_eq!(state.node_id(idx), Some("only"));
		assert!(state.node_at_position(10.0, 10.0).is_none());
	}
}

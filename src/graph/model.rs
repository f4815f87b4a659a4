use log::warn;

use crate::api::{GraphPayload, NodeRecord};

/// Same palette the canvas uses for ungrouped data.
const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeKind {
	File,
	Function,
	Class,
	Module,
	Package,
	#[default]
	Default,
}

impl NodeKind {
	pub const ALL: [NodeKind; 6] = [
		NodeKind::File,
		NodeKind::Function,
		NodeKind::Class,
		NodeKind::Module,
		NodeKind::Package,
		NodeKind::Default,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			NodeKind::File => "file",
			NodeKind::Function => "function",
			NodeKind::Class => "class",
			NodeKind::Module => "module",
			NodeKind::Package => "package",
			NodeKind::Default => "default",
		}
	}

	/// Unknown backend types render as [`NodeKind::Default`].
	pub fn parse(value: &str) -> Self {
		let value = value.trim();
		Self::ALL
			.into_iter()
			.find(|k| k.as_str().eq_ignore_ascii_case(value))
			.unwrap_or_default()
	}

	pub fn color(self) -> &'static str {
		match self {
			NodeKind::File => COLORS[0],
			NodeKind::Function => COLORS[1],
			NodeKind::Class => COLORS[2],
			NodeKind::Module => COLORS[4],
			NodeKind::Package => COLORS[3],
			NodeKind::Default => COLORS[7],
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	pub id: String,
	pub label: String,
	pub kind: NodeKind,
	pub observations: Vec<String>,
}

impl From<NodeRecord> for GraphNode {
	fn from(record: NodeRecord) -> Self {
		Self {
			label: record.label.unwrap_or_else(|| record.id.clone()),
			kind: record.kind.as_deref().map(NodeKind::parse).unwrap_or_default(),
			id: record.id,
			observations: record.observations,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
	pub id: String,
	pub from: String,
	pub to: String,
	pub label: String,
}

impl GraphEdge {
	pub fn touches(&self, node_id: &str) -> bool {
		self.from == node_id || self.to == node_id
	}
}

/// Whatever a removal took out, with the positions needed to put it back.
#[derive(Clone, Debug)]
pub struct RemovedNode {
	index: usize,
	node: GraphNode,
	edges: Vec<(usize, GraphEdge)>,
}

/// Client-side copy of the backend graph. Insertion order is preserved so
/// the layout seeds nodes in a stable ring.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphSnapshot {
	nodes: Vec<GraphNode>,
	edges: Vec<GraphEdge>,
}

impl GraphSnapshot {
	pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
		let mut snapshot = Self::default();
		for node in nodes {
			snapshot.insert_node(node);
		}
		snapshot.edges = edges;
		snapshot
	}

	pub fn from_payload(payload: GraphPayload) -> Self {
		let nodes = payload.nodes.into_iter().map(GraphNode::from).collect();
		let edges = payload
			.edges
			.into_iter()
			.map(|e| {
				let label = e.label.unwrap_or_default();
				GraphEdge {
					id: e
						.id
						.unwrap_or_else(|| derived_edge_id(&e.from, &label, &e.to)),
					from: e.from,
					to: e.to,
					label,
				}
			})
			.collect();
		Self::new(nodes, edges)
	}

	pub fn nodes(&self) -> &[GraphNode] {
		&self.nodes
	}

	pub fn edges(&self) -> &[GraphEdge] {
		&self.edges
	}

	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
		self.edges.iter().find(|e| e.id == id)
	}

	pub fn contains_node(&self, id: &str) -> bool {
		self.node(id).is_some()
	}

	/// Edges with an endpoint missing from the node set.
	pub fn dangling_edges(&self) -> impl Iterator<Item = &GraphEdge> {
		self.edges
			.iter()
			.filter(|e| !self.contains_node(&e.from) || !self.contains_node(&e.to))
	}

	/// Inserts, or replaces in place when the id already exists.
	pub fn insert_node(&mut self, node: GraphNode) {
		match self.nodes.iter_mut().find(|n| n.id == node.id) {
			Some(existing) => {
				warn!("duplicate node id {}, keeping the latest", node.id);
				*existing = node;
			}
			None => self.nodes.push(node),
		}
	}

	/// Returns false when the node is gone (e.g. replaced by a reload).
	pub fn replace_node(&mut self, node: GraphNode) -> bool {
		match self.nodes.iter_mut().find(|n| n.id == node.id) {
			Some(existing) => {
				*existing = node;
				true
			}
			None => false,
		}
	}

	pub fn remove_node(&mut self, id: &str) -> Option<RemovedNode> {
		let index = self.nodes.iter().position(|n| n.id == id)?;
		let node = self.nodes.remove(index);
		let mut edges = Vec::new();
		let mut kept = Vec::with_capacity(self.edges.len());
		for (i, edge) in std::mem::take(&mut self.edges).into_iter().enumerate() {
			if edge.touches(id) {
				edges.push((i, edge));
			} else {
				kept.push(edge);
			}
		}
		self.edges = kept;
		Some(RemovedNode { index, node, edges })
	}

	pub fn restore_node(&mut self, removed: RemovedNode) {
		if self.contains_node(&removed.node.id) {
			return;
		}
		let index = removed.index.min(self.nodes.len());
		self.nodes.insert(index, removed.node);
		for (i, edge) in removed.edges {
			self.restore_edge(i, edge);
		}
	}

	/// Moves a node to a new id, re-pointing its edges. If `to` already
	/// exists (a reload raced the confirmation) the provisional copy is
	/// dropped.
	pub fn rename_node(&mut self, from: &str, to: &str) {
		if from == to {
			return;
		}
		if self.contains_node(to) {
			self.nodes.retain(|n| n.id != from);
		} else if let Some(node) = self.nodes.iter_mut().find(|n| n.id == from) {
			node.id = to.to_owned();
		} else {
			return;
		}
		for edge in &mut self.edges {
			if edge.from == from {
				edge.from = to.to_owned();
			}
			if edge.to == from {
				edge.to = to.to_owned();
			}
		}
	}

	pub fn insert_edge(&mut self, edge: GraphEdge) {
		match self.edges.iter_mut().find(|e| e.id == edge.id) {
			Some(existing) => *existing = edge,
			None => self.edges.push(edge),
		}
	}

	pub fn remove_edge(&mut self, id: &str) -> Option<(usize, GraphEdge)> {
		let index = self.edges.iter().position(|e| e.id == id)?;
		Some((index, self.edges.remove(index)))
	}

	pub fn restore_edge(&mut self, index: usize, edge: GraphEdge) {
		if self.edge(&edge.id).is_some() {
			return;
		}
		let index = index.min(self.edges.len());
		self.edges.insert(index, edge);
	}

	pub fn rename_edge(&mut self, from: &str, to: &str) {
		if from == to {
			return;
		}
		if self.edge(to).is_some() {
			self.edges.retain(|e| e.id != from);
		} else if let Some(edge) = self.edges.iter_mut().find(|e| e.id == from) {
			edge.id = to.to_owned();
		}
	}
}

/// Relations created by backends that do not assign ids are addressed by
/// their endpoints and type.
pub fn derived_edge_id(from: &str, label: &str, to: &str) -> String {
	format!("{from}:{label}:{to}")
}

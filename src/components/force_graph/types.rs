use crate::graph::GraphSnapshot;

#[derive(Clone, Debug, PartialEq)]
pub struct CanvasNode {
	pub id: String,
	pub label: String,
	pub color: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CanvasLink {
	pub source: String,
	pub target: String,
	pub label: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanvasData {
	pub nodes: Vec<CanvasNode>,
	pub links: Vec<CanvasLink>,
}

impl From<&GraphSnapshot> for CanvasData {
	fn from(snapshot: &GraphSnapshot) -> Self {
		Self {
			nodes: snapshot
				.nodes()
				.iter()
				.map(|n| CanvasNode {
					id: n.id.clone(),
					label: n.label.clone(),
					color: n.kind.color().into(),
				})
				.collect(),
			links: snapshot
				.edges()
				.iter()
				.map(|e| CanvasLink {
					source: e.from.clone(),
					target: e.to.clone(),
					label: e.label.clone(),
				})
				.collect(),
		}
	}
}

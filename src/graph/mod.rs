//! Knowledge-graph view-model.

mod locks;
mod model;
mod view_model;

pub use model::{GraphEdge, GraphNode, GraphSnapshot, NodeKind};
pub use view_model::{GraphViewModel, NodeUpdate};

use crate::api::LiveApi;

pub type LiveGraph = GraphViewModel<LiveApi>;

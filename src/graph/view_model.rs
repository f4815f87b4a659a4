//! In-memory mirror of the backend graph with optimistic CRUD.
//!
//! Every mutation is applied to the local snapshot first, then sent to the
//! backend. A confirmation reconciles provisional ids, a failure rolls the
//! local change back and hands the error to the caller. Mutations touching
//! the same entity id are serialized; unrelated ones run concurrently.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use log::{debug, info, warn};

use super::locks::EntityLocks;
use super::model::{GraphEdge, GraphNode, GraphSnapshot, NodeKind, derived_edge_id};
use crate::api::{ApiError, EntityRecord, EntityUpdate, KgApi, NewEntity, NewRelation, NodeDetails};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
	#[error(transparent)]
	Api(#[from] ApiError),
	#[error("node `{0}` is not in the graph")]
	UnknownNode(String),
	#[error("relation `{0}` is not in the graph")]
	UnknownEdge(String),
	#[error("{0} must not be empty")]
	Empty(&'static str),
}

impl GraphError {
	pub fn user_message(&self) -> String {
		match self {
			GraphError::Api(err) => err.user_message(),
			other => other.to_string(),
		}
	}
}

/// Fields to change on a node; `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeUpdate {
	pub label: Option<String>,
	pub kind: Option<NodeKind>,
}

type Listener = Box<dyn Fn(&GraphSnapshot)>;

pub struct GraphViewModel<A> {
	api: A,
	snapshot: RefCell<GraphSnapshot>,
	last_update: RefCell<Option<String>>,
	selected: RefCell<Option<String>>,
	locks: EntityLocks,
	renamed: RefCell<HashMap<String, String>>,
	next_provisional: Cell<u64>,
	listeners: RefCell<Vec<Listener>>,
}

impl<A: KgApi> GraphViewModel<A> {
	pub fn new(api: A) -> Self {
		Self {
			api,
			snapshot: RefCell::new(GraphSnapshot::default()),
			last_update: RefCell::new(None),
			selected: RefCell::new(None),
			locks: EntityLocks::default(),
			renamed: RefCell::new(HashMap::new()),
			next_provisional: Cell::new(1),
			listeners: RefCell::new(Vec::new()),
		}
	}

	pub fn snapshot(&self) -> GraphSnapshot {
		self.snapshot.borrow().clone()
	}

	pub fn last_update(&self) -> Option<String> {
		self.last_update.borrow().clone()
	}

	pub fn selected(&self) -> Option<String> {
		self.selected.borrow().clone()
	}

	/// Called with the new snapshot after every local change.
	pub fn subscribe(&self, listener: impl Fn(&GraphSnapshot) + 'static) {
		self.listeners.borrow_mut().push(Box::new(listener));
	}

	fn mutate<R>(&self, f: impl FnOnce(&mut GraphSnapshot) -> R) -> R {
		let result = f(&mut self.snapshot.borrow_mut());
		let snapshot = self.snapshot.borrow();
		for listener in self.listeners.borrow().iter() {
			listener(&snapshot);
		}
		result
	}

	fn provisional_id(&self, prefix: &str) -> String {
		let n = self.next_provisional.get();
		self.next_provisional.set(n + 1);
		format!("{prefix}-{n}")
	}

	/// Follows ids re-keyed by an update that finished while the caller
	/// waited for the entity lock.
	fn resolve(&self, id: &str) -> String {
		let renamed = self.renamed.borrow();
		let snapshot = self.snapshot.borrow();
		let mut current = id;
		for _ in 0..=renamed.len() {
			if snapshot.contains_node(current) {
				break;
			}
			match renamed.get(current) {
				Some(next) => current = next,
				None => break,
			}
		}
		current.to_owned()
	}

	/// Replaces the snapshot with the backend's. On failure the current
	/// snapshot is left as it was.
	pub async fn load(&self) -> Result<usize, GraphError> {
		let payload = self.api.graph().await?;
		*self.last_update.borrow_mut() = payload.timestamp.clone();
		let snapshot = GraphSnapshot::from_payload(payload);
		let dangling = snapshot.dangling_edges().count();
		if dangling > 0 {
			warn!("graph snapshot has {dangling} dangling relation(s)");
		}
		let count = snapshot.nodes().len();
		self.mutate(|s| *s = snapshot);
		info!("graph loaded: {count} nodes");
		Ok(count)
	}

	/// Returns the backend-confirmed id.
	pub async fn create_node(
		&self,
		label: &str,
		kind: NodeKind,
		observations: Vec<String>,
	) -> Result<String, GraphError> {
		let label = label.trim();
		if label.is_empty() {
			return Err(GraphError::Empty("label"));
		}
		let provisional = self.provisional_id("pending");
		self.mutate(|s| {
			s.insert_node(GraphNode {
				id: provisional.clone(),
				label: label.to_owned(),
				kind,
				observations: observations.clone(),
			})
		});

		let request = NewEntity {
			name: label,
			entity_type: kind.as_str(),
			observations: &observations,
		};
		match self.api.create_entity(&request).await {
			Ok(record) => {
				let confirmed = record.confirmed_id().to_owned();
				debug!("node {provisional} confirmed as {confirmed}");
				self.mutate(|s| s.rename_node(&provisional, &confirmed));
				Ok(confirmed)
			}
			Err(err) => {
				warn!("create node {label:?} failed, rolling back: {err}");
				self.mutate(|s| s.remove_node(&provisional));
				Err(err.into())
			}
		}
	}

	pub async fn update_node(&self, id: &str, update: NodeUpdate) -> Result<(), GraphError> {
		let _guard = self.locks.lock(id).await;
		let resolved = self.resolve(id);
		let id = resolved.as_str();
		let previous = self
			.snapshot
			.borrow()
			.node(id)
			.cloned()
			.ok_or_else(|| GraphError::UnknownNode(id.to_owned()))?;

		let mut updated = previous.clone();
		if let Some(label) = update.label.map(|l| l.trim().to_owned()) {
			if label.is_empty() {
				return Err(GraphError::Empty("label"));
			}
			updated.label = label;
		}
		if let Some(kind) = update.kind {
			updated.kind = kind;
		}
		if updated == previous {
			return Ok(());
		}
		self.mutate(|s| s.replace_node(updated.clone()));

		let request = EntityUpdate {
			old_name: &previous.label,
			new_name: &updated.label,
			entity_type: updated.kind.as_str(),
		};
		match self.api.update_entity(&request).await {
			Ok(record) => {
				self.reconcile_id(id, &record);
				Ok(())
			}
			Err(err) => {
				warn!("update node {id} failed, rolling back: {err}");
				self.mutate(|s| s.replace_node(previous));
				Err(err.into())
			}
		}
	}

	fn reconcile_id(&self, id: &str, record: &EntityRecord) {
		let confirmed = record.confirmed_id();
		if confirmed == id {
			return;
		}
		debug!("node {id} re-keyed as {confirmed}");
		self.mutate(|s| s.rename_node(id, confirmed));
		{
			let mut renamed = self.renamed.borrow_mut();
			renamed.remove(confirmed);
			renamed.insert(id.to_owned(), confirmed.to_owned());
		}
		let mut selected = self.selected.borrow_mut();
		if selected.as_deref() == Some(id) {
			*selected = Some(confirmed.to_owned());
		}
	}

	/// Removes the node and every relation touching it.
	pub async fn delete_node(&self, id: &str) -> Result<(), GraphError> {
		let _guard = self.locks.lock(id).await;
		let resolved = self.resolve(id);
		let id = resolved.as_str();
		if !self.snapshot.borrow().contains_node(id) {
			return Err(GraphError::UnknownNode(id.to_owned()));
		}
		let Some(removed) = self.mutate(|s| s.remove_node(id)) else {
			return Err(GraphError::UnknownNode(id.to_owned()));
		};

		match self.api.delete_entity(id).await {
			Ok(()) => {
				let mut selected = self.selected.borrow_mut();
				if selected.as_deref() == Some(id) {
					*selected = None;
				}
				Ok(())
			}
			Err(err) => {
				warn!("delete node {id} failed, restoring: {err}");
				self.mutate(|s| s.restore_node(removed));
				Err(err.into())
			}
		}
	}

	/// Relations to nodes outside the snapshot are accepted; the renderer
	/// skips them.
	pub async fn create_edge(&self, from: &str, to: &str, label: &str) -> Result<String, GraphError> {
		let label = label.trim();
		if label.is_empty() {
			return Err(GraphError::Empty("relation type"));
		}
		{
			let snapshot = self.snapshot.borrow();
			if !snapshot.contains_node(from) || !snapshot.contains_node(to) {
				warn!("relation {from} -> {to} references a node outside the snapshot");
			}
		}
		let provisional = self.provisional_id("pending-edge");
		self.mutate(|s| {
			s.insert_edge(GraphEdge {
				id: provisional.clone(),
				from: from.to_owned(),
				to: to.to_owned(),
				label: label.to_owned(),
			})
		});

		let request = NewRelation {
			from,
			to,
			relation_type: label,
		};
		match self.api.create_relation(&request).await {
			Ok(record) => {
				let confirmed = record
					.id
					.unwrap_or_else(|| derived_edge_id(from, label, to));
				self.mutate(|s| s.rename_edge(&provisional, &confirmed));
				Ok(confirmed)
			}
			Err(err) => {
				warn!("create relation {from} -> {to} failed, rolling back: {err}");
				self.mutate(|s| s.remove_edge(&provisional));
				Err(err.into())
			}
		}
	}

	pub async fn delete_edge(&self, id: &str) -> Result<(), GraphError> {
		let _guard = self.locks.lock(id).await;
		if self.snapshot.borrow().edge(id).is_none() {
			return Err(GraphError::UnknownEdge(id.to_owned()));
		}
		let Some((index, edge)) = self.mutate(|s| s.remove_edge(id)) else {
			return Err(GraphError::UnknownEdge(id.to_owned()));
		};
		match self.api.delete_relation(id).await {
			Ok(()) => Ok(()),
			Err(err) => {
				warn!("delete relation {id} failed, restoring: {err}");
				self.mutate(|s| s.restore_edge(index, edge));
				Err(err.into())
			}
		}
	}

	/// Marks `id` as selected and fetches its details.
	pub async fn select_node(&self, id: &str) -> Result<NodeDetails, GraphError> {
		*self.selected.borrow_mut() = Some(id.to_owned());
		self.details(id).await
	}

	pub fn clear_selection(&self) {
		self.selected.borrow_mut().take();
	}

	/// Observations and relations as the backend knows them. Read-only.
	pub async fn details(&self, id: &str) -> Result<NodeDetails, GraphError> {
		Ok(self.api.node_details(id).await?)
	}

	pub async fn search(&self, query: &str) -> Result<Vec<EntityRecord>, GraphError> {
		let query = query.trim();
		if query.is_empty() {
			return Ok(Vec::new());
		}
		Ok(self.api.search(query).await?)
	}
}

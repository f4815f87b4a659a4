//! `/api/kg/*` contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{ApiClient, Transport, segment};
use super::error::ApiError;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GraphPayload {
	#[serde(default)]
	pub nodes: Vec<NodeRecord>,
	#[serde(default)]
	pub edges: Vec<EdgeRecord>,
	#[serde(default)]
	pub timestamp: Option<String>,
}

/// `/api/kg/data` answers with the bare payload, the AI blueprint's
/// `/kg/visualize` wraps it in `{success, data}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum GraphEnvelope {
	Wrapped { data: GraphPayload },
	Bare(GraphPayload),
}

impl From<GraphEnvelope> for GraphPayload {
	fn from(envelope: GraphEnvelope) -> Self {
		match envelope {
			GraphEnvelope::Wrapped { data } => data,
			GraphEnvelope::Bare(payload) => payload,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NodeRecord {
	pub id: String,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default, rename = "type")]
	pub kind: Option<String>,
	#[serde(default)]
	pub observations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EdgeRecord {
	#[serde(default)]
	pub id: Option<String>,
	pub from: String,
	pub to: String,
	#[serde(default)]
	pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRecord {
	#[serde(default)]
	pub id: Option<String>,
	pub from: String,
	pub to: String,
	#[serde(default)]
	pub relation_type: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NodeDetails {
	pub id: String,
	#[serde(default)]
	pub label: String,
	#[serde(default, rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub observations: Vec<String>,
	#[serde(default)]
	pub relations: Vec<RelationRecord>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
	#[serde(default)]
	pub id: Option<String>,
	pub name: String,
	#[serde(default)]
	pub entity_type: String,
	#[serde(default)]
	pub observations: Vec<String>,
}

impl EntityRecord {
	/// The backend keys entities by name when it does not hand out ids.
	pub fn confirmed_id(&self) -> &str {
		self.id.as_deref().unwrap_or(&self.name)
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntity<'a> {
	pub name: &'a str,
	pub entity_type: &'a str,
	pub observations: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUpdate<'a> {
	pub old_name: &'a str,
	pub new_name: &'a str,
	pub entity_type: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRelation<'a> {
	pub from: &'a str,
	pub to: &'a str,
	pub relation_type: &'a str,
}

#[allow(async_fn_in_trait)]
pub trait KgApi {
	async fn graph(&self) -> Result<GraphPayload, ApiError>;
	async fn node_details(&self, id: &str) -> Result<NodeDetails, ApiError>;
	async fn search(&self, query: &str) -> Result<Vec<EntityRecord>, ApiError>;
	async fn create_entity(&self, entity: &NewEntity<'_>) -> Result<EntityRecord, ApiError>;
	async fn update_entity(&self, update: &EntityUpdate<'_>) -> Result<EntityRecord, ApiError>;
	async fn delete_entity(&self, id: &str) -> Result<(), ApiError>;
	async fn create_relation(&self, relation: &NewRelation<'_>) -> Result<RelationRecord, ApiError>;
	async fn delete_relation(&self, id: &str) -> Result<(), ApiError>;
}

impl<T: Transport> KgApi for ApiClient<T> {
	async fn graph(&self) -> Result<GraphPayload, ApiError> {
		let envelope: GraphEnvelope = self.get(&self.graph_data_path).await?;
		Ok(envelope.into())
	}

	async fn node_details(&self, id: &str) -> Result<NodeDetails, ApiError> {
		self.get(&format!("/api/kg/node/{}", segment(id))).await
	}

	async fn search(&self, query: &str) -> Result<Vec<EntityRecord>, ApiError> {
		self.get(&format!("/api/kg/search?q={}", segment(query)))
			.await
	}

	async fn create_entity(&self, entity: &NewEntity<'_>) -> Result<EntityRecord, ApiError> {
		self.post("/api/kg/entity", entity).await
	}

	async fn update_entity(&self, update: &EntityUpdate<'_>) -> Result<EntityRecord, ApiError> {
		self.put("/api/kg/entity", update).await
	}

	async fn delete_entity(&self, id: &str) -> Result<(), ApiError> {
		let _: Value = self
			.delete(&format!("/api/kg/entity/{}", segment(id)))
			.await?;
		Ok(())
	}

	async fn create_relation(&self, relation: &NewRelation<'_>) -> Result<RelationRecord, ApiError> {
		self.post("/api/kg/relation", relation).await
	}

	async fn delete_relation(&self, id: &str) -> Result<(), ApiError> {
		let _: Value = self
			.delete(&format!("/api/kg/relation/{}", segment(id)))
			.await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn graph_payload_accepts_bare_and_wrapped_forms() {
		let bare: GraphEnvelope = serde_json::from_str(
			r#"{"nodes":[{"id":"a","label":"A","type":"class"}],"edges":[]}"#,
		)
		.unwrap();
		let wrapped: GraphEnvelope = serde_json::from_str(
			r#"{"success":true,"data":{"nodes":[{"id":"a","label":"A","type":"class"}],"edges":[]}}"#,
		)
		.unwrap();
		let bare = GraphPayload::from(bare);
		assert_eq!(bare, GraphPayload::from(wrapped));
		assert_eq!(bare.nodes[0].kind.as_deref(), Some("class"));
	}

	#[test]
	fn requests_use_backend_field_names() {
		let observations = vec!["fast".to_owned()];
		let body = serde_json::to_value(NewEntity {
			name: "parser",
			entity_type: "module",
			observations: &observations,
		})
		.unwrap();
		assert_eq!(
			body,
			serde_json::json!({"name": "parser", "entityType": "module", "observations": ["fast"]})
		);

		let body = serde_json::to_value(EntityUpdate {
			old_name: "a",
			new_name: "b",
			entity_type: "file",
		})
		.unwrap();
		assert_eq!(
			body,
			serde_json::json!({"oldName": "a", "newName": "b", "entityType": "file"})
		);
	}

	#[test]
	fn entity_without_id_is_keyed_by_name() {
		let record: EntityRecord =
			serde_json::from_str(r#"{"name":"parser","entityType":"module"}"#).unwrap();
		assert_eq!(record.confirmed_id(), "parser");
	}
}

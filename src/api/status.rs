//! Health and rule-engine endpoints polled by the dashboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::client::{ApiClient, Transport};
use super::error::ApiError;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct HealthReport {
	pub score: f64,
	#[serde(default)]
	pub components: BTreeMap<String, ComponentHealth>,
	#[serde(default)]
	pub timestamp: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ComponentHealth {
	pub score: f64,
	#[serde(default)]
	pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RuleEngineStatus {
	pub status: String,
	#[serde(default)]
	pub active_rules: Vec<RuleSummary>,
	#[serde(default)]
	pub last_update: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RuleSummary {
	pub id: String,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub status: String,
}

#[derive(Debug, Serialize)]
struct TriggerRequest<'a> {
	trigger: &'a str,
	context: &'a Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TriggerResponse {
	#[serde(default)]
	result: Value,
}

#[allow(async_fn_in_trait)]
pub trait StatusApi {
	async fn health(&self) -> Result<HealthReport, ApiError>;
	async fn rule_engine_status(&self) -> Result<RuleEngineStatus, ApiError>;
	/// Fires a rule-engine trigger by name and returns the engine's result.
	async fn trigger_rule(&self, trigger: &str, context: &Map<String, Value>) -> Result<Value, ApiError>;
}

impl<T: Transport> StatusApi for ApiClient<T> {
	async fn health(&self) -> Result<HealthReport, ApiError> {
		self.get("/api/health").await
	}

	async fn rule_engine_status(&self) -> Result<RuleEngineStatus, ApiError> {
		self.get("/api/rule-engine/status").await
	}

	async fn trigger_rule(&self, trigger: &str, context: &Map<String, Value>) -> Result<Value, ApiError> {
		let response: TriggerResponse = self
			.post("/api/rule-engine/trigger", &TriggerRequest { trigger, context })
			.await?;
		Ok(response.result)
	}
}

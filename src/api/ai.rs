//! `/api/ai/*` contract.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::client::{ApiClient, Transport};
use super::error::ApiError;

/// Free-form context echoed between queries.
pub type QueryContext = Map<String, Value>;

#[derive(Debug, Serialize)]
pub struct QueryRequest<'a> {
	pub query: &'a str,
	pub context: &'a QueryContext,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct QueryResponse {
	#[serde(default)]
	pub response: Value,
	#[serde(default)]
	pub confidence: f64,
	#[serde(default)]
	pub context: QueryContext,
}

impl QueryResponse {
	/// Older backends answer `{"response": {"answer": "..."}}`.
	pub fn answer(&self) -> String {
		match &self.response {
			Value::String(text) => text.clone(),
			Value::Null => String::new(),
			Value::Object(fields) => match fields.get("answer") {
				Some(Value::String(text)) => text.clone(),
				_ => self.response.to_string(),
			},
			other => other.to_string(),
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AiStatus {
	#[serde(default)]
	pub model_loaded: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
	Helpful,
	NotHelpful,
}

impl Feedback {
	pub fn label(self) -> &'static str {
		match self {
			Feedback::Helpful => "👍 Helpful",
			Feedback::NotHelpful => "👎 Not Helpful",
		}
	}
}

#[derive(Debug, Serialize)]
struct FeedbackRequest<'a> {
	feedback: Feedback,
	query_id: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateRuleRequest<'a> {
	description: &'a str,
}

#[allow(async_fn_in_trait)]
pub trait AiApi {
	async fn query(&self, query: &str, context: &QueryContext) -> Result<QueryResponse, ApiError>;
	async fn status(&self) -> Result<AiStatus, ApiError>;
	async fn feedback(&self, query_id: &str, feedback: Feedback) -> Result<(), ApiError>;
	/// Drafts a rule from a plain-language description. The body is opaque.
	async fn generate_rule(&self, description: &str) -> Result<Value, ApiError>;
}

impl<T: Transport> AiApi for ApiClient<T> {
	async fn query(&self, query: &str, context: &QueryContext) -> Result<QueryResponse, ApiError> {
		let path = format!("{}/query", self.ai_prefix);
		self.post(&path, &QueryRequest { query, context }).await
	}

	async fn status(&self) -> Result<AiStatus, ApiError> {
		self.get(&format!("{}/status", self.ai_prefix)).await
	}

	async fn feedback(&self, query_id: &str, feedback: Feedback) -> Result<(), ApiError> {
		let path = format!("{}/feedback", self.ai_prefix);
		let _: Value = self
			.post(&path, &FeedbackRequest { feedback, query_id })
			.await?;
		Ok(())
	}

	async fn generate_rule(&self, description: &str) -> Result<Value, ApiError> {
		let path = format!("{}/generate-rule", self.ai_prefix);
		self.post(&path, &GenerateRuleRequest { description }).await
	}
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use futures::executor::block_on;
	use serde_json::json;

	use super::*;
	use crate::api::Method;
	use crate::testing::MockTransport;

	#[test]
	fn answer_handles_both_response_shapes() {
		let plain: QueryResponse =
			serde_json::from_value(json!({"success": true, "response": "hi", "confidence": 0.5})).unwrap();
		assert_eq!(plain.answer(), "hi");

		let nested: QueryResponse =
			serde_json::from_value(json!({"response": {"answer": "nested"}})).unwrap();
		assert_eq!(nested.answer(), "nested");
	}

	#[test]
	fn feedback_serializes_snake_case() {
		let body = serde_json::to_value(FeedbackRequest {
			feedback: Feedback::NotHelpful,
			query_id: "42",
		})
		.unwrap();
		assert_eq!(body, json!({"feedback": "not_helpful", "query_id": "42"}));
	}

	#[test]
	fn generate_rule_posts_description() {
		let transport = Rc::new(MockTransport::default());
		let client = ApiClient::new(transport.clone(), "/api/kg/data", "/api/ai");
		transport.respond(200, r#"{"rule": {"name": "no-unwrap", "severity": "warning"}}"#);

		let rule = block_on(client.generate_rule("flag unwrap in library code")).unwrap();
		assert_eq!(rule["rule"]["name"], "no-unwrap");

		let request = &transport.requests()[0];
		assert_eq!(request.method, Method::Post);
		assert_eq!(request.path, "/api/ai/generate-rule");
		let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
		assert_eq!(body, json!({"description": "flag unwrap in library code"}));
	}
}

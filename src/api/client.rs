//! Uniform request/response handling for every backend call.

use std::fmt;
use std::rc::Rc;

use gloo_net::http::Request;
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ApiError, TransportError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
	Get,
	Post,
	Put,
	Delete,
}

impl fmt::Display for Method {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		})
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	pub method: Method,
	pub path: String,
	/// Serialized JSON body.
	pub body: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
	pub status: u16,
	pub body: String,
}

impl RawResponse {
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Moves a request over the wire. Implementations never interpret status
/// codes or bodies; that is [`ApiClient`]'s job.
#[allow(async_fn_in_trait)]
pub trait Transport {
	async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError>;
}

impl<T: Transport> Transport for Rc<T> {
	async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
		(**self).send(request).await
	}
}

/// Browser `fetch` via gloo-net.
#[derive(Clone, Debug, Default)]
pub struct FetchTransport {
	base_url: String,
}

impl FetchTransport {
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
		}
	}
}

impl Transport for FetchTransport {
	async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
		let url = format!("{}{}", self.base_url, request.path);
		let builder = match request.method {
			Method::Get => Request::get(&url),
			Method::Post => Request::post(&url),
			Method::Put => Request::put(&url),
			Method::Delete => Request::delete(&url),
		};
		let sent = match &request.body {
			Some(body) => builder
				.header("Content-Type", "application/json")
				.body(body.clone())
				.map_err(|e| TransportError(e.to_string()))?
				.send()
				.await,
			None => builder.send().await,
		};
		let response = sent.map_err(|e| TransportError(e.to_string()))?;
		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|e| TransportError(e.to_string()))?;
		Ok(RawResponse { status, body })
	}
}

/// Typed JSON calls over a [`Transport`]. No retries happen here.
#[derive(Clone, Debug)]
pub struct ApiClient<T> {
	transport: T,
	pub(crate) graph_data_path: String,
	pub(crate) ai_prefix: String,
}

impl<T: Transport> ApiClient<T> {
	pub fn new(
		transport: T,
		graph_data_path: impl Into<String>,
		ai_prefix: impl Into<String>,
	) -> Self {
		Self {
			transport,
			graph_data_path: graph_data_path.into(),
			ai_prefix: ai_prefix.into(),
		}
	}

	pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
		self.call(Method::Get, path, None).await
	}

	pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
	where
		B: Serialize + ?Sized,
		R: DeserializeOwned,
	{
		let body = serde_json::to_string(body).map_err(ApiError::Encode)?;
		self.call(Method::Post, path, Some(body)).await
	}

	pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
	where
		B: Serialize + ?Sized,
		R: DeserializeOwned,
	{
		let body = serde_json::to_string(body).map_err(ApiError::Encode)?;
		self.call(Method::Put, path, Some(body)).await
	}

	pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
		self.call(Method::Delete, path, None).await
	}

	async fn call<R: DeserializeOwned>(
		&self,
		method: Method,
		path: &str,
		body: Option<String>,
	) -> Result<R, ApiError> {
		let request = ApiRequest {
			method,
			path: path.to_owned(),
			body,
		};
		debug!("{method} {path}");
		let response = self.transport.send(&request).await.inspect_err(|e| {
			warn!("{method} {path} failed: {e}");
		})?;
		decode(response).inspect_err(|e| debug!("{method} {path}: {e}"))
	}
}

/// Percent-encodes one path segment (entity names may contain spaces or `/`).
pub fn segment(raw: &str) -> String {
	urlencoding::encode(raw).into_owned()
}

pub(crate) fn decode<R: DeserializeOwned>(response: RawResponse) -> Result<R, ApiError> {
	let success = response.is_success();
	let value = if response.body.trim().is_empty() {
		Value::Null
	} else {
		match serde_json::from_str::<Value>(&response.body) {
			Ok(value) => value,
			Err(err) if success => return Err(ApiError::Decode(err)),
			// error pages are often HTML; the status is what matters
			Err(_) => Value::Null,
		}
	};

	if !success {
		return Err(ApiError::Http {
			status: response.status,
			message: error_field(&value).unwrap_or_default(),
		});
	}
	if let Some(message) = logical_failure(&value) {
		return Err(ApiError::Logical(message));
	}
	serde_json::from_value(value).map_err(ApiError::Decode)
}

fn error_field(value: &Value) -> Option<String> {
	value.get("error").and_then(Value::as_str).map(str::to_owned)
}

fn logical_failure(value: &Value) -> Option<String> {
	if let Some(message) = error_field(value) {
		return Some(message);
	}
	if value.get("success").and_then(Value::as_bool) == Some(false) {
		let message = value
			.get("message")
			.and_then(Value::as_str)
			.unwrap_or("the backend reported a failure");
		return Some(message.to_owned());
	}
	None
}

#[cfg(test)]
mod tests {
	use futures::executor::block_on;
	use serde::Deserialize;

	use super::*;
	use crate::testing::MockTransport;

	#[derive(Debug, Deserialize, PartialEq)]
	struct Pong {
		pong: u32,
	}

	fn ok(body: &str) -> RawResponse {
		RawResponse {
			status: 200,
			body: body.into(),
		}
	}

	#[test]
	fn decodes_success_body() {
		let pong: Pong = decode(ok(r#"{"pong": 3}"#)).unwrap();
		assert_eq!(pong, Pong { pong: 3 });
	}

	#[test]
	fn empty_body_is_null() {
		let unit: () = decode(ok("")).unwrap();
		assert_eq!(unit, ());
		let value: Value = decode(ok("  ")).unwrap();
		assert_eq!(value, Value::Null);
	}

	#[test]
	fn non_2xx_becomes_http_error_with_backend_message() {
		let err = decode::<Value>(RawResponse {
			status: 500,
			body: r#"{"error": "Failed to create entity"}"#.into(),
		})
		.unwrap_err();
		assert!(matches!(err, ApiError::Http { status: 500, .. }));
		assert!(err.user_message().contains("Failed to create entity"));
	}

	#[test]
	fn html_error_page_keeps_status() {
		let err = decode::<Value>(RawResponse {
			status: 404,
			body: "<html>not found</html>".into(),
		})
		.unwrap_err();
		assert_eq!(err.user_message(), "HTTP error! status: 404");
	}

	#[test]
	fn success_false_is_logical_failure() {
		let err = decode::<Value>(ok(r#"{"success": false}"#)).unwrap_err();
		assert!(matches!(err, ApiError::Logical(_)));
		let err = decode::<Value>(ok(r#"{"model_loaded": false, "error": "no model"}"#)).unwrap_err();
		assert_eq!(err.user_message(), "no model");
	}

	#[test]
	fn garbage_2xx_is_decode_error() {
		assert!(matches!(
			decode::<Value>(ok("not json")),
			Err(ApiError::Decode(_))
		));
		assert!(matches!(
			decode::<Pong>(ok(r#"{"ping": 1}"#)),
			Err(ApiError::Decode(_))
		));
	}

	#[test]
	fn client_sends_json_and_surfaces_transport_errors() {
		let transport = Rc::new(MockTransport::default());
		transport.respond(200, r#"{"pong": 1}"#);
		let client = ApiClient::new(transport.clone(), "/api/kg/data", "/api/ai");

		let pong: Pong = block_on(client.post("/ping", &serde_json::json!({"a": 1}))).unwrap();
		assert_eq!(pong.pong, 1);
		let sent = transport.requests();
		assert_eq!(sent[0].method, Method::Post);
		assert_eq!(sent[0].body.as_deref(), Some(r#"{"a":1}"#));

		transport.fail("connection refused");
		let err = block_on(client.get::<Value>("/ping")).unwrap_err();
		assert_eq!(err.user_message(), "network error: connection refused");
	}

	#[test]
	fn segments_are_percent_encoded() {
		assert_eq!(segment("my node/v2"), "my%20node%2Fv2");
	}
}

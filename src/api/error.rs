/// Transport-level failure (DNS, connection refused, CORS, aborted fetch).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Every failed remote call ends up here, whatever layer it failed at.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
	#[error("network error: {0}")]
	Transport(#[from] TransportError),

	/// Non-2xx status. `message` is the body's `error` field when present.
	#[error("HTTP error! status: {status}{}", detail(.message))]
	Http { status: u16, message: String },

	/// 2xx response carrying `success: false` or an `error` field.
	#[error("{0}")]
	Logical(String),

	#[error("malformed response: {0}")]
	Decode(#[source] serde_json::Error),

	#[error("failed to encode request: {0}")]
	Encode(#[source] serde_json::Error),
}

impl ApiError {
	/// One line suitable for a toast or inline error panel.
	pub fn user_message(&self) -> String {
		self.to_string()
	}
}

fn detail(message: &str) -> String {
	if message.is_empty() {
		String::new()
	} else {
		format!(" ({message})")
	}
}

//! Backend contracts and the remote call wrapper they share.

mod ai;
mod client;
mod error;
mod kg;
mod status;

pub use ai::{AiApi, AiStatus, Feedback, QueryContext, QueryResponse};
pub use client::{ApiClient, FetchTransport, Transport};
#[cfg(test)]
pub use client::{ApiRequest, Method, RawResponse};
pub use error::{ApiError, TransportError};
pub use kg::{
	EntityRecord, EntityUpdate, GraphPayload, KgApi, NewEntity, NewRelation,
	NodeDetails, NodeRecord,
};
pub use status::{HealthReport, RuleEngineStatus, StatusApi};

use crate::config::AppConfig;

/// The client every live component talks through.
pub type LiveApi = ApiClient<FetchTransport>;

pub fn live_client(config: &AppConfig) -> LiveApi {
	ApiClient::new(
		FetchTransport::new(config.api_base.clone()),
		config.graph_data_path.clone(),
		config.ai_prefix.clone(),
	)
}

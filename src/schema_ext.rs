use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Timestamps are stored as `timestamptz` and serialized as RFC 3339
#[derive(Serialize, Deserialize, ToSchema)]
#[schema(value_type = String, format = "date-time", example = "2024-05-01T18:30:00Z")]
pub struct DateTimeWrapper(pub DateTime<Utc>);

//! Room listing DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::RoomSummary;

/// One room in `GET /api/v1/rooms`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoomSummaryDto {
    /// Room name.
    pub name: String,
    /// Current number of members.
    pub member_count: usize,
}

impl From<RoomSummary> for RoomSummaryDto {
    fn from(summary: RoomSummary) -> Self {
        Self {
            name: summary.name,
            member_count: summary.member_count,
        }
    }
}

/// Response body for `GET /api/v1/rooms`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoomListResponse {
    /// Rooms in configuration order.
    pub data: Vec<RoomSummaryDto>,
    /// Number of rooms.
    pub total: usize,
}

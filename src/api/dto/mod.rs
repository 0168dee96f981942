//! Data Transfer Objects for REST request/response serialization.

pub mod chat_dto;
pub mod room_dto;

pub use chat_dto::*;
pub use room_dto::*;

//! Game ingestion: payload validation, upstream source adapter, and the
//! orchestration of single and batch inserts.

pub mod bgg;
pub mod orchestrator;
pub mod payload;

pub use bgg::{BggClient, BggSource};
pub use orchestrator::{insert_bgg_game, insert_bgg_game_list, insert_game, BatchReport};
pub use payload::GamePayload;

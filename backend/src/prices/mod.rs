pub mod memory;
pub mod model;
pub mod repository;
pub mod repository_sqlx;
pub mod store;

pub use model::{AssetSnapshot, DeltaSet, PriceData};
pub use store::SnapshotStore;

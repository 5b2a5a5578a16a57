pub mod error;
pub mod types;

pub use error::{Result, TopoError};
pub use types::{KeyRange, ShardKey, TabletAlias, TabletType};

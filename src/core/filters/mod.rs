pub mod data;
pub mod io;
pub mod store;

pub use data::{ChannelRule, FilterData, ServerRule};
pub use io::{FilterStoreError, StagedSave};
pub use store::FilterStore;

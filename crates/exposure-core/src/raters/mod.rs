pub mod local;
pub mod remote;

pub use local::LocalBatchRater;
pub use remote::{dispatch, DispatchReport};

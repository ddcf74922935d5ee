pub mod assessment;
pub mod detection;
pub mod pipeline;
pub mod session;
pub mod shared;

pub mod guidance;
pub mod session_event;
pub mod session_handle;
pub mod session_state;
pub mod status_publisher;

pub mod client;
pub mod heartbeat;
pub mod home_assistant;
pub mod notify;
pub mod sink;

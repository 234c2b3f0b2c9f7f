pub mod api;
pub mod batch;
pub mod credential;
pub mod layout;
pub mod recognition;

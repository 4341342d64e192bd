pub mod call_room_repo;
pub mod event_repo;
pub mod help_request_repo;
pub mod profile_repo;
pub mod schema;
pub mod store;
pub mod util;

pub mod backend;
pub mod daily;

pub mod admin;
pub mod orders;
pub mod public;
pub mod users;

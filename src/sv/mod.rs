pub mod link;
pub mod user;

pub use link::Link;
pub use user::{Registration, User};

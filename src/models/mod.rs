//! Record types exchanged over HTTP and stored in the `users` table.

pub mod user;

pub use user::{NewUser, User, UserCreate, UserList, DEFAULT_DEPARTMENT};

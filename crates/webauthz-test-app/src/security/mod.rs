pub mod headers;
pub mod middleware;
pub mod session;

pub use session::{Session, SessionHandle, SessionStore};

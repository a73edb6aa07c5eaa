//! Request-pipeline middleware: session resolution and CSRF double-submit
//! verification, run in that order ahead of every handler.

pub mod csrf;
pub mod session;

pub use csrf::csrf_middleware;
pub use session::{session_middleware, CurrentUser};

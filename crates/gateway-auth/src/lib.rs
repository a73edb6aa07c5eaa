//! Password hashing, session cookies, CSRF double-submit tokens, and
//! device-cookie bruteforce protection for the gateway.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod csrf;
pub mod device_cookie;
pub mod login;
pub mod password;
pub mod settings;

pub use device_cookie::FailedLoginTracker;
pub use login::{login, LoginOutcome};
pub use settings::{BruteforceProtectionSettings, CookieSettings, CsrfProtectionSettings};

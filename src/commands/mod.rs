//! Command implementations. Each function validates its local input, makes
//! its request(s) through the session and prints the outcome.

pub mod instance;
pub mod settings;
pub mod user;

//! Authentication and recovery endpoints.

pub mod login;
pub mod password;
pub mod recovery;
pub mod session;
pub mod signup;
pub mod types;

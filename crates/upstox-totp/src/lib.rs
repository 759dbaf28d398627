#![doc = include_str!("../README.md")]

pub mod api;
pub mod client;
mod config;
mod credentials;
mod error;
pub mod login;
mod session;
pub mod totp;

pub use client::{Client, ClientSettings};
pub use config::Config;
pub use credentials::{Credentials, SecretString};
pub use error::{ConfigError, ErrorKind, TotpError, UpstoxError, ValidationError};
pub use login::{AccessTokenResult, ErrorDetail, LoginStep, LoginStepResult, TokenData};
pub use session::SessionState;

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod security;
pub mod services;
pub mod sources;
pub mod storage;
pub mod validation;
pub mod vcard;

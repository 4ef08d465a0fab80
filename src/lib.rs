pub mod config;
pub mod core;
pub mod db;
pub mod engines;
pub mod location;
pub mod notifications;
pub mod provider;
pub mod service;

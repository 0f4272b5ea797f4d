pub mod auth_service;
pub mod notifier;
pub mod user_repository;

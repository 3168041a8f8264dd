pub mod desired_key_registry;
pub mod reconcile_service;

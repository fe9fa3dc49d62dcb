pub mod assignment;
pub mod catalog;
pub mod checkout;
pub mod import;
pub mod notifier;
pub mod sms_service;
pub mod auth_service;

pub(crate) mod admin_credentials;
pub(crate) mod admin_packages;
pub(crate) mod admin_transactions;
pub(crate) mod admin_users;
pub(crate) mod auth;
pub(crate) mod health;
pub(crate) mod sms_relay;
pub(crate) mod storefront;

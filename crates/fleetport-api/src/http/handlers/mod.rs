pub mod admin_handler;
pub mod device_handler;
pub mod license_handler;

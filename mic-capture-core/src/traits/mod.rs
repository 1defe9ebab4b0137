pub mod byte_sink;
pub mod capture_delegate;
pub mod capture_device;
pub mod capture_session;

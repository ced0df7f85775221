//! Repository implementations for all pronotif entities.

pub mod account;
pub mod device;
pub mod notification;
pub mod request_log;
pub mod snapshot;

pub use account::AccountRepository;
pub use device::DeviceTokenRepository;
pub use notification::NotificationRepository;
pub use request_log::RequestLogRepository;
pub use snapshot::SnapshotRepository;

//! Request audit trail of the app API.

pub mod model;

pub use model::{CreateRequestLog, RequestLog};

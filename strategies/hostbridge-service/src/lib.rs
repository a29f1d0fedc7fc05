//! Runs a HostBridge host inside an operating system service.
//!
//! The service manager calls [ServiceHostBase::on_start] and [ServiceHostBase::on_stop] (or
//! [ServiceHostBase::on_shutdown]) from its own threads. Start failures are reported to the
//! manager; every failure during stop is logged and swallowed so the manager can finish.

pub mod checks;
mod service;

pub use service::{HostFactory, ServiceHostBase, EXIT_CODE_EXCEPTION_IN_SERVICE};

//! Process-wide default service, for call sites that are not handed one.
//!
//! Prefer constructing an [`OrientationService`] at startup and passing it
//! around. The default instance is built on first use from the environment.

use std::sync::{Arc, PoisonError, RwLock};

use lazy_static::lazy_static;
use tracing::debug;

use crate::config::Settings;
use crate::error::Result;
use crate::platform;
use crate::service::OrientationService;

lazy_static! {
    static ref DEFAULT_SERVICE: RwLock<Option<Arc<OrientationService>>> = RwLock::new(None);
}

/// The default service, built from [`Settings::from_env`] on first access.
pub fn default_service() -> Result<Arc<OrientationService>> {
    if let Some(service) = DEFAULT_SERVICE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return Ok(Arc::clone(service));
    }

    let mut slot = DEFAULT_SERVICE
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(service) = slot.as_ref() {
        return Ok(Arc::clone(service));
    }
    debug!("building default orientation service");
    let service = Arc::new(platform::detect(&Settings::from_env())?);
    *slot = Some(Arc::clone(&service));
    Ok(service)
}

/// Replace the default service. `None` makes the next access build a fresh one.
pub fn set_default_service(service: Option<Arc<OrientationService>>) {
    *DEFAULT_SERVICE
        .write()
        .unwrap_or_else(PoisonError::into_inner) = service;
}

/// Feed a rotation seen by the host UI framework into the default service.
/// See [`OrientationService::notify_orientation_change`].
pub fn notify_orientation_change(raw_degrees: i32, framework_driven: bool) -> Result<()> {
    default_service()?.notify_orientation_change(raw_degrees, framework_driven);
    Ok(())
}

//! Picks the sensor and display backend for the running system.

use std::env;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{Backend, Settings};
use crate::devices::dummy::DummyRotator;
use crate::devices::wlroots::WlrootsRotator;
use crate::devices::xrandr::XRandRRotator;
use crate::devices::Rotator;
use crate::error::{Error, Result};
use crate::sensors::dummy::DummySensor;
use crate::sensors::{NoSensor, Sensor};
use crate::service::OrientationService;

/// Build a service for the backend named in `settings`.
pub fn detect(settings: &Settings) -> Result<OrientationService> {
    let rotator = detect_rotator(settings)?;
    let sensor = detect_sensor(settings);
    Ok(OrientationService::new(sensor, rotator))
}

fn detect_rotator(settings: &Settings) -> Result<Arc<dyn Rotator>> {
    match settings.backend {
        Backend::Dummy => Ok(Arc::new(DummyRotator::default())),
        Backend::Xrandr => Ok(Arc::new(XRandRRotator::connect(&settings.display)?)),
        Backend::Wlroots => Ok(Arc::new(WlrootsRotator::connect(&settings.display)?)),
        Backend::Auto => {
            if env::var_os("WAYLAND_DISPLAY").is_some() {
                match WlrootsRotator::connect(&settings.display) {
                    Ok(rotator) => {
                        info!("using wlroots output management for {}", settings.display);
                        return Ok(Arc::new(rotator));
                    }
                    Err(e) => debug!("wlroots backend unavailable: {}", e),
                }
            }
            if env::var_os("DISPLAY").is_some() {
                let rotator = XRandRRotator::connect(&settings.display)?;
                info!("using xrandr for {}", settings.display);
                return Ok(Arc::new(rotator));
            }
            Err(Error::NoPlatform)
        }
    }
}

fn detect_sensor(settings: &Settings) -> Arc<dyn Sensor> {
    if settings.backend == Backend::Dummy {
        return Arc::new(DummySensor::new());
    }
    #[cfg(target_os = "linux")]
    {
        if let Some(sensor) =
            crate::sensors::linux_iio::IioSensor::discover(settings.poll_interval, settings.threshold)
        {
            return Arc::new(sensor);
        }
    }
    info!("no accelerometer found, orientation changes will not be reported");
    Arc::new(NoSensor)
}

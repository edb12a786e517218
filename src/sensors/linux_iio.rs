//! Accelerometer exposed through the Linux Industrial I/O subsystem.
//!
//! The raw x/y readings are polled from sysfs on a background thread.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use glob::glob;
use tracing::{debug, warn};

use super::{RawRotationHandler, Sensor};
use crate::error::Result;

const IIO_ACCEL_PATTERN: &str = "/sys/bus/iio/devices/iio:device*/in_accel_*_raw";

pub struct IioSensor {
    path_x: PathBuf,
    path_y: PathBuf,
    poll_interval: Duration,
    threshold: i32,
    stop: Mutex<Option<Arc<AtomicBool>>>,
}

impl IioSensor {
    /// Look for an accelerometer. `None` when the device has none.
    pub fn discover(poll_interval: Duration, threshold: i32) -> Option<Self> {
        let mut path_x = None;
        let mut path_y = None;
        let entries = match glob(IIO_ACCEL_PATTERN) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("bad accelerometer glob pattern: {}", e);
                return None;
            }
        };
        for entry in entries {
            match entry {
                Ok(path) => {
                    let name = path.to_string_lossy();
                    if name.ends_with("x_raw") {
                        path_x.get_or_insert(path);
                    } else if name.ends_with("y_raw") {
                        path_y.get_or_insert(path);
                    }
                }
                Err(e) => debug!("skipping unreadable iio entry: {}", e),
            }
        }

        match (path_x, path_y) {
            (Some(path_x), Some(path_y)) => {
                debug!("using accelerometer {:?} / {:?}", path_x, path_y);
                Some(IioSensor::new(path_x, path_y, poll_interval, threshold))
            }
            _ => None,
        }
    }

    pub fn new(path_x: PathBuf, path_y: PathBuf, poll_interval: Duration, threshold: i32) -> Self {
        IioSensor {
            path_x,
            path_y,
            poll_interval,
            threshold,
            stop: Mutex::new(None),
        }
    }
}

fn read_axis(path: &Path) -> Result<i32> {
    let raw = fs::read_to_string(path)?;
    Ok(raw.trim_end_matches('\n').trim().parse::<i32>().unwrap_or(0))
}

/// Clockwise rotation suggested by the gravity vector.
///
/// Upside down wins over sideways, and readings inside the threshold count as upright.
pub fn rotation_from_accel(x: i32, y: i32, threshold: i32) -> i32 {
    if y > threshold {
        180
    } else if x < -threshold {
        90
    } else if x > threshold {
        270
    } else {
        0
    }
}

impl Sensor for IioSensor {
    fn can_detect_orientation(&self) -> bool {
        self.path_x.exists() && self.path_y.exists()
    }

    fn enable(&self, handler: RawRotationHandler) -> Result<()> {
        let mut slot = self.stop.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Ok(());
        }
        let stop = Arc::new(AtomicBool::new(false));
        let (path_x, path_y) = (self.path_x.clone(), self.path_y.clone());
        let (poll_interval, threshold) = (self.poll_interval, self.threshold);
        let stopped = stop.clone();

        thread::Builder::new()
            .name("iio-accel".into())
            .spawn(move || {
                while !stopped.load(Ordering::SeqCst) {
                    match read_axis(&path_x).and_then(|x| read_axis(&path_y).map(|y| (x, y))) {
                        Ok((x, y)) => handler(rotation_from_accel(x, y, threshold)),
                        Err(e) => warn!("failed to read accelerometer: {}", e),
                    }
                    thread::sleep(poll_interval);
                }
                debug!("accelerometer polling stopped");
            })?;

        *slot = Some(stop);
        Ok(())
    }

    fn disable(&self) {
        // The poller notices on its next wake-up; it may be this very thread.
        if let Some(stop) = self.stop.lock().unwrap_or_else(PoisonError::into_inner).take() {
            stop.store(true, Ordering::SeqCst);
        }
    }

    fn release(&self) {
        self.disable();
    }
}

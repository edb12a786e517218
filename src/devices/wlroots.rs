//! Wayland compositors implementing `wlr_output_management_v1` (sway, Hyprland, ...).

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};
use wayland_client::{
    event_created_child,
    protocol::{wl_output::Transform, wl_registry},
    Connection, Dispatch, EventQueue, QueueHandle,
};
use wayland_protocols_wlr::output_management::v1::client::{
    zwlr_output_configuration_head_v1::{self, ZwlrOutputConfigurationHeadV1},
    zwlr_output_configuration_v1::{self, ZwlrOutputConfigurationV1},
    zwlr_output_head_v1::{self, ZwlrOutputHeadV1},
    zwlr_output_manager_v1::{self, ZwlrOutputManagerV1},
    zwlr_output_mode_v1::{self, ZwlrOutputModeV1},
};

use super::{DisplayChain, Rotator};
use crate::error::{Error, Result};
use crate::orientation::{ScreenLock, ROTATION_UNKNOWN};

pub struct WlrootsRotator {
    inner: Mutex<WaylandState>,
}

struct WaylandState {
    state: AppData,
    event_queue: EventQueue<AppData>,
}

impl WlrootsRotator {
    pub fn connect(target_display: &str) -> Result<WlrootsRotator> {
        let conn = Connection::connect_to_env()
            .map_err(|e| Error::Wayland(format!("could not connect to wayland socket: {}", e)))?;
        let wl_display = conn.display();
        let mut event_queue = conn.new_event_queue();
        let _registry = wl_display.get_registry(&event_queue.handle(), ());
        let mut state = AppData::new(&event_queue, target_display.to_string());
        roundtrip(&mut event_queue, &mut state)?;
        // Roundtrip a second time to sync the outputs
        roundtrip(&mut event_queue, &mut state)?;

        if state.output_manager.is_none() {
            return Err(Error::Wayland(
                "compositor does not support wlr_output_management_v1".into(),
            ));
        }

        Ok(WlrootsRotator {
            inner: Mutex::new(WaylandState { state, event_queue }),
        })
    }
}

fn roundtrip(event_queue: &mut EventQueue<AppData>, state: &mut AppData) -> Result<()> {
    event_queue
        .roundtrip(state)
        .map(|_| ())
        .map_err(|e| Error::Wayland(format!("failed to read display changes: {}", e)))
}

impl WaylandState {
    /// Receive (and send) all buffered messages across the wayland socket.
    fn read_socket(&mut self) -> Result<()> {
        roundtrip(&mut self.event_queue, &mut self.state)
    }

    /// Send all buffered messages across the wayland socket.
    fn write_socket(&self) -> Result<()> {
        self.event_queue
            .flush()
            .map_err(|e| Error::Wayland(format!("failed to apply display changes: {}", e)))
    }

    fn chain(&self) -> DisplayChain {
        let display = self.state.target_head.is_some() && self.state.target_enabled;
        DisplayChain {
            context: true,
            manager: self.state.output_manager.is_some(),
            display,
            rotation: if display {
                self.state.current_transform.map(transform_degrees)
            } else {
                None
            },
        }
    }
}

fn transform_degrees(transform: Transform) -> i32 {
    match transform {
        Transform::Normal => 0,
        Transform::_90 => 90,
        Transform::_180 => 180,
        Transform::_270 => 270,
        _ => ROTATION_UNKNOWN,
    }
}

fn lock_transform(lock: ScreenLock) -> Option<Transform> {
    match lock {
        ScreenLock::Portrait => Some(Transform::Normal),
        ScreenLock::Landscape => Some(Transform::_90),
        ScreenLock::ReversePortrait => Some(Transform::_180),
        ScreenLock::ReverseLandscape => Some(Transform::_270),
        ScreenLock::Unspecified => None,
    }
}

impl Rotator for WlrootsRotator {
    fn current_rotation(&self) -> Result<i32> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.read_socket()?;
        if inner.state.target_head.is_none() || !inner.state.target_enabled {
            return Err(Error::NoForeground);
        }
        inner
            .state
            .current_transform
            .map(transform_degrees)
            .ok_or(Error::MissingHandle("transform"))
    }

    fn request_orientation(&self, lock: ScreenLock) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.read_socket()?;
        if inner.state.target_head.is_none() || !inner.state.target_enabled {
            return Err(Error::NoForeground);
        }
        if let Some(transform) = lock_transform(lock) {
            info!(
                "wlroots: setting {} transform to {:?}",
                inner.state.target_display_name, transform
            );
            inner.state.update_configuration(transform)?;
            inner.write_socket()?;
        }
        Ok(())
    }

    fn display_chain(&self) -> DisplayChain {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match inner.read_socket() {
            Ok(()) => inner.chain(),
            Err(e) => {
                debug!("wayland display chain unreadable: {}", e);
                DisplayChain::default()
            }
        }
    }
}

struct AppData {
    target_display_name: String,
    target_head: Option<ZwlrOutputHeadV1>,
    target_enabled: bool,
    output_manager: Option<ZwlrOutputManagerV1>,
    current_config_serial: Option<u32>,
    current_transform: Option<Transform>,
    queue_handle: QueueHandle<AppData>,
}

impl AppData {
    fn new(event_queue: &EventQueue<AppData>, target_display_name: String) -> Self {
        AppData {
            target_display_name,
            queue_handle: event_queue.handle(),
            target_head: None,
            target_enabled: true,
            output_manager: None,
            current_config_serial: None,
            current_transform: None,
        }
    }

    fn update_configuration(&mut self, new_transform: Transform) -> Result<()> {
        match (
            &self.output_manager,
            self.current_config_serial,
            &self.target_head,
        ) {
            (Some(output_manager), Some(serial), Some(head)) => {
                let configuration =
                    output_manager.create_configuration(serial, &self.queue_handle, ());
                let head_config = configuration.enable_head(head, &self.queue_handle, ());
                head_config.set_transform(new_transform);
                configuration.apply();
                Ok(())
            }
            (None, _, _) => Err(Error::MissingHandle("output manager")),
            (_, None, _) => Err(Error::MissingHandle("configuration serial")),
            (_, _, None) => Err(Error::NoForeground),
        }
    }

    fn is_target(&self, head: &ZwlrOutputHeadV1) -> bool {
        self.target_head.as_ref() == Some(head)
    }
}

/// Event handlers

impl Dispatch<wl_registry::WlRegistry, ()> for AppData {
    fn event(
        state: &mut Self,
        registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<AppData>,
    ) {
        if let wl_registry::Event::Global {
            name,
            interface,
            version,
        } = event
        {
            if interface == "zwlr_output_manager_v1" {
                state.output_manager =
                    Some(registry.bind::<ZwlrOutputManagerV1, (), AppData>(name, version, qh, ()));
            }
        }
    }
}

impl Dispatch<ZwlrOutputManagerV1, ()> for AppData {
    fn event(
        state: &mut Self,
        _: &ZwlrOutputManagerV1,
        event: zwlr_output_manager_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<AppData>,
    ) {
        match event {
            zwlr_output_manager_v1::Event::Done { serial } => {
                state.current_config_serial = Some(serial);
            }
            zwlr_output_manager_v1::Event::Finished => {
                state.output_manager = None;
            }
            _ => {}
        }
    }

    event_created_child!(AppData, ZwlrOutputHeadV1, [
       zwlr_output_manager_v1::EVT_HEAD_OPCODE => (ZwlrOutputHeadV1, ()),
    ]);
}

impl Dispatch<ZwlrOutputHeadV1, ()> for AppData {
    fn event(
        state: &mut Self,
        head: &ZwlrOutputHeadV1,
        event: zwlr_output_head_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<AppData>,
    ) {
        match event {
            zwlr_output_head_v1::Event::Name { name } => {
                if name == state.target_display_name {
                    debug!("found target display: {}", name);
                    state.target_head = Some(head.clone());
                }
            }
            zwlr_output_head_v1::Event::Enabled { enabled } if state.is_target(head) => {
                state.target_enabled = enabled != 0;
            }
            zwlr_output_head_v1::Event::Transform { transform } if state.is_target(head) => {
                state.current_transform = transform.into_result().ok();
            }
            zwlr_output_head_v1::Event::Finished if state.is_target(head) => {
                debug!("target display {} went away", state.target_display_name);
                state.target_head = None;
                state.current_transform = None;
            }
            _ => {}
        }
    }

    event_created_child!(AppData, ZwlrOutputModeV1, [
       zwlr_output_head_v1::EVT_CURRENT_MODE_OPCODE => (ZwlrOutputModeV1, ()),
       zwlr_output_head_v1::EVT_MODE_OPCODE => (ZwlrOutputModeV1, ()),
    ]);
}

impl Dispatch<ZwlrOutputModeV1, ()> for AppData {
    fn event(
        _state: &mut Self,
        _: &ZwlrOutputModeV1,
        _: zwlr_output_mode_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<AppData>,
    ) {
    }
}

impl Dispatch<ZwlrOutputConfigurationV1, ()> for AppData {
    fn event(
        _state: &mut Self,
        config: &ZwlrOutputConfigurationV1,
        event: zwlr_output_configuration_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<AppData>,
    ) {
        match event {
            zwlr_output_configuration_v1::Event::Succeeded => {
                debug!("output configuration applied");
                config.destroy();
            }
            zwlr_output_configuration_v1::Event::Failed => {
                debug!("output configuration failed");
                config.destroy();
            }
            zwlr_output_configuration_v1::Event::Cancelled => {
                debug!("output configuration cancelled");
                config.destroy();
            }
            _ => {}
        }
    }
}

impl Dispatch<ZwlrOutputConfigurationHeadV1, ()> for AppData {
    fn event(
        _state: &mut Self,
        _: &ZwlrOutputConfigurationHeadV1,
        _: zwlr_output_configuration_head_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<AppData>,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::Orientation;

    #[test]
    fn transforms_round_trip_through_locks() {
        for orientation in Orientation::ALL {
            let lock = ScreenLock::from(orientation);
            match lock_transform(lock) {
                Some(transform) => {
                    assert_eq!(Some(transform_degrees(transform)), lock.rotation_degrees())
                }
                None => assert_eq!(lock, ScreenLock::Unspecified),
            }
        }
    }

    #[test]
    fn flipped_transforms_are_unknown() {
        for transform in [
            Transform::Flipped,
            Transform::Flipped90,
            Transform::Flipped180,
            Transform::Flipped270,
        ] {
            assert_eq!(
                Orientation::from_degrees(transform_degrees(transform)),
                Orientation::Undefined
            );
        }
    }
}

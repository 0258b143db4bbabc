//! Safe state on supervisor loss.
use crate::devices::dispatcher::{records::ActuatorControls, Plant};

/// Holds every output off while the supervisor link is lost, and keeps
/// the alarm raised until it comes back.
#[derive(Copy, Clone, Debug, Default)]
pub struct FailSafe {
    engaged: bool,
}

impl FailSafe {
    pub fn new() -> Self { Self::default() }

    pub fn is_engaged(&self) -> bool { self.engaged }

    /// Call every main loop iteration with the current link state.
    ///
    /// While the link is lost the all-off controls are applied on every
    /// call, overriding anything a control write applied since.
    pub fn update<PL: Plant>(&mut self, link_lost: bool, plant: &mut PL) {
        match (self.engaged, link_lost) {
            (false, true) => {
                warn!("Supervisor link lost, switching every output off");
                plant.indicate_alarm(true);
                self.engaged = true;
            }
            (true, false) => {
                info!("Supervisor link recovered");
                plant.indicate_alarm(false);
                self.engaged = false;
            }
            _ => {}
        }

        if link_lost {
            plant.apply(&ActuatorControls::all_off());
        }
    }
}

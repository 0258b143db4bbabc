use crate::devices::dispatcher::{
    records::{ActuatorControls, ProcessSnapshot},
    Plant,
};

/// Records everything applied to it, and reports a snapshot echoing the
/// latest controls: the cooling air position mirrors the commanded valve
/// position and `spare1` carries the effective steam setpoint.
#[derive(Debug, Default)]
pub struct MockPlant {
    pub applied: Vec<ActuatorControls>,
    pub alarm: bool,
    pub alarm_changes: usize,
    pub snapshots: usize,
    pub baseline: ProcessSnapshot,
}

impl MockPlant {
    pub fn latest(&self) -> Option<&ActuatorControls> { self.applied.last() }
}

impl Plant for MockPlant {
    fn apply(&mut self, controls: &ActuatorControls) { self.applied.push(*controls); }

    fn snapshot(&mut self) -> ProcessSnapshot {
        self.snapshots += 1;
        let mut snapshot = self.baseline;
        if let Some(controls) = self.applied.last() {
            snapshot.cooling_air_position = controls.cooling_air_valve_position as u16;
            snapshot.analogue.spare1 = controls.steam_flow_setpoint();
        }
        snapshot
    }

    fn indicate_alarm(&mut self, active: bool) {
        if self.alarm != active {
            self.alarm_changes += 1;
        }
        self.alarm = active;
    }
}

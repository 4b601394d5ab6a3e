#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisState {
    Unhomed,
    Homing,
    Idle,
    Moving,
    Fault,
}

impl AxisState {
    pub fn is_homed(&self) -> bool {
        matches!(self, AxisState::Idle | AxisState::Moving)
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Fraction of the accumulated integral discarded on every update.
    pub integral_decay: f64,
    pub reset_on_setpoint_change: bool,
}

impl PidGains {
    pub fn proportional(kp: f64) -> Self {
        Self {
            kp,
            ..Default::default()
        }
    }

    pub fn with_integral(mut self, ki: f64, decay: f64) -> Self {
        self.ki = ki;
        self.integral_decay = decay;
        self
    }

    pub fn with_derivative(mut self, kd: f64) -> Self {
        self.kd = kd;
        self
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.6,
            ki: 0.0,
            kd: 0.0,
            integral_decay: 0.05,
            reset_on_setpoint_change: true,
        }
    }
}

/// The output is not clamped; callers limit it to whatever range their
/// actuator accepts.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    setpoint: f64,
    integral: f64,
    prev_error: Option<f64>,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            setpoint: 0.0,
            integral: 0.0,
            prev_error: None,
        }
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        if self.gains.reset_on_setpoint_change && setpoint != self.setpoint {
            self.reset();
        }
        self.setpoint = setpoint;
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }

    pub fn update(&mut self, measurement: f64) -> f64 {
        let error = self.setpoint - measurement;

        self.integral = self.integral * (1.0 - self.gains.integral_decay) + error;

        let derivative = match self.prev_error {
            Some(prev) => error - prev,
            None => 0.0,
        };
        self.prev_error = Some(error);

        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // First-order plant: the output acts as a rate on the measured value.
    fn simulate(pid: &mut PidController, start: f64, steps: usize) -> (f64, Option<usize>) {
        let dt = 0.01;
        let gain = 20.0;
        let mut value = start;
        let mut settled_at = None;
        for step in 0..steps {
            let out = pid.update(value).clamp(-1.0, 1.0);
            value += out * gain * dt;
            if settled_at.is_none() && (pid.setpoint() - value).abs() < 0.01 {
                settled_at = Some(step);
            }
        }
        (value, settled_at)
    }

    #[test]
    fn test_step_response_converges() {
        let mut pid = PidController::new(PidGains::proportional(0.7));
        pid.set_setpoint(5.0);
        let (value, settled_at) = simulate(&mut pid, 0.0, 2000);
        assert!((value - 5.0).abs() < 0.01);
        assert!(settled_at.expect("never settled") < 500);
    }

    #[test]
    fn test_integral_term_converges_without_overshooting_badly() {
        let gains = PidGains::proportional(0.5)
            .with_integral(0.01, 0.05)
            .with_derivative(0.1);
        let mut pid = PidController::new(gains);
        pid.set_setpoint(-2.0);
        let (value, _) = simulate(&mut pid, 1.0, 3000);
        assert!((value + 2.0).abs() < 0.01);
    }

    #[test]
    fn test_first_update_has_no_derivative_kick() {
        let mut pid = PidController::new(PidGains::proportional(0.0).with_derivative(10.0));
        pid.set_setpoint(3.0);
        assert_eq!(pid.update(0.0), 0.0);
        assert_eq!(pid.update(1.0), -10.0);
    }

    #[test]
    fn test_setpoint_change_resets_windup() {
        let gains = PidGains::proportional(0.0).with_integral(1.0, 0.0);
        let mut pid = PidController::new(gains);
        pid.set_setpoint(10.0);
        for _ in 0..50 {
            pid.update(0.0);
        }
        assert_eq!(pid.integral(), 500.0);

        pid.set_setpoint(1.0);
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.update(0.0), 1.0);
    }

    #[test]
    fn test_windup_carries_over_when_reset_disabled() {
        let mut gains = PidGains::proportional(0.0).with_integral(1.0, 0.0);
        gains.reset_on_setpoint_change = false;
        let mut pid = PidController::new(gains);
        pid.set_setpoint(10.0);
        for _ in 0..10 {
            pid.update(0.0);
        }
        pid.set_setpoint(0.0);
        // Stale integral still dominates after the target moved.
        assert_eq!(pid.update(0.0), 100.0);
    }

    #[test]
    fn test_integral_decay_bounds_accumulation() {
        let gains = PidGains::proportional(0.0).with_integral(1.0, 0.5);
        let mut pid = PidController::new(gains);
        pid.set_setpoint(1.0);
        let mut out = 0.0;
        for _ in 0..100 {
            out = pid.update(0.0);
        }
        assert!((out - 2.0).abs() < 1e-9);
    }
}

// ==============================================================================
// tire_curve.rs — EXTREMUM / ASYMPTOTE TIRE FORCE CURVE
// ------------------------------------------------------------------------------
// Friction coefficient as a function of |slip|:
//
//   value
//     ^        extremum
//     |          /\
//     |         /  \______________ asymptote
//     |        /
//     |       /
//     +------+-----+--------------> |slip|
//        extremum_slip  asymptote_slip
//
// - linear from (0, 0) to (extremum_slip, extremum_value)
// - linear from the extremum to (asymptote_slip, asymptote_value)
// - flat at asymptote_value beyond that
// - everything scaled by stiffness_factor
// ==============================================================================

use crate::suspension::types::TireTuning;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TireForceCurve {
    extremum_slip: f32,
    extremum_value: f32,
    asymptote_slip: f32,
    asymptote_value: f32,
    stiffness: f32,
}

impl TireForceCurve {
    pub fn new(tire: &TireTuning) -> Self {
        let extremum_slip = tire.extremum_slip.max(1e-4);
        Self {
            extremum_slip,
            extremum_value: tire.extremum_value.max(0.0),
            asymptote_slip: tire.asymptote_slip.max(extremum_slip),
            asymptote_value: tire.asymptote_value.max(0.0),
            stiffness: tire.stiffness_factor.max(0.0),
        }
    }

    pub fn evaluate(&self, slip: f32) -> f32 {
        let s = slip.abs();
        let value = if s <= self.extremum_slip {
            self.extremum_value * s / self.extremum_slip
        } else if s < self.asymptote_slip {
            let t = (s - self.extremum_slip) / (self.asymptote_slip - self.extremum_slip);
            self.extremum_value + (self.asymptote_value - self.extremum_value) * t
        } else {
            self.asymptote_value
        };
        value * self.stiffness
    }

    /// Peak coefficient, i.e. the most grip this tire can ever produce.
    pub fn peak(&self) -> f32 {
        self.extremum_value.max(self.asymptote_value) * self.stiffness
    }
}

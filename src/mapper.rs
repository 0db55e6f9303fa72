use tracing::{debug, warn};

use crate::{
    conversion::{self, MotionConstants},
    error::ServoError,
    model::{Axis, ChannelPair, PairDecoding},
    servo::Actuator,
};

/// Everything computed for one issued move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePlan {
    pub target: i32,
    pub current: i32,
    pub distance: i32,
    pub duration_ms: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisOutcome {
    Unchanged,
    Moved(MovePlan),
    Failed(ServoError),
}

impl AxisOutcome {
    pub fn moved(&self) -> Option<&MovePlan> {
        match self {
            AxisOutcome::Moved(plan) => Some(plan),
            _ => None,
        }
    }
}

/// Edge-triggered mapping of one axis' channel pair onto its servo.
#[derive(Debug, Clone)]
pub struct AxisController {
    axis: Axis,
    decoding: PairDecoding,
    constants: MotionConstants,
    last: ChannelPair,
}

impl AxisController {
    pub fn new(axis: Axis, constants: MotionConstants) -> Self {
        Self { axis, decoding: PairDecoding::for_axis(axis), constants, last: ChannelPair::default() }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn last_pair(&self) -> ChannelPair {
        self.last
    }

    pub fn target_for(&self, pair: ChannelPair) -> i32 {
        self.constants.angle_for(conversion::combine(pair, self.decoding))
    }

    /// Distance and move time from a reported position. Readings beyond
    /// `max_angle` are treated as the home position.
    pub fn plan(&self, target: i32, reported: i32) -> MovePlan {
        let current = if reported > self.constants.max_angle {
            debug!(axis = %self.axis, reported, "position out of range, assuming home");
            0
        } else {
            reported
        };
        let distance = (target - current).abs();
        MovePlan { target, current, distance, duration_ms: self.constants.duration_for(distance) }
    }

    /// Issue a move when `pair` differs from the previously seen pair.
    ///
    /// The stored pair is updated before the servo is queried, so a failed
    /// exchange is not repeated until the input changes again.
    pub fn update<A: Actuator + ?Sized>(&mut self, pair: ChannelPair, servo: &mut A) -> AxisOutcome {
        if pair == self.last {
            return AxisOutcome::Unchanged;
        }
        self.last = pair;

        let target = self.target_for(pair);
        let result = servo.read_position().and_then(|reported| {
            let plan = self.plan(target, reported);
            servo.move_to(plan.target, plan.duration_ms).map(|()| plan)
        });

        match result {
            Ok(plan) => {
                debug!(
                    axis = %self.axis,
                    target = plan.target,
                    current = plan.current,
                    distance = plan.distance,
                    duration_ms = plan.duration_ms,
                    "axis move"
                );
                AxisOutcome::Moved(plan)
            }
            Err(e) => {
                warn!(axis = %self.axis, "axis command failed: {e}");
                AxisOutcome::Failed(e)
            }
        }
    }
}

//! The simulation stepper: vehicle kinematics, obstacle sensing, reward
//! shaping, and the per-tick handshake with the learning agent.
//!
//! One call to [`Simulation::advance_tick`] is one transition: the stepper
//! builds the observation from the current pose and field, hands the agent
//! the reward earned by the previous action, applies the newly chosen action
//! to the heading, moves the car, and computes the reward the agent will see
//! next tick. The caller drives the tick rate; nothing here suspends or
//! spawns.

mod field;

pub use field::SandField;

use log::{debug, info};
use ndarray::{array, Array1};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::activations::Activation;
use crate::agent::{DqnAgent, DqnAgentBuilder};
use crate::error::{PilotError, Result};
use crate::network::Layer;
use crate::optimizer::{Adam, OptimizerWrapper};

/// Length of the observation vector: three sensor densities, the normalized
/// bearing to the goal, and its negation.
pub const OBSERVATION_LEN: usize = 5;

/// All simulation tunables. `rotations` doubles as the action table: the
/// agent's action count and the network's output width both derive from its
/// length, enforced at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    pub width: usize,
    pub height: usize,
    /// Clamp margin around the field edge, also the sensor validity border
    pub margin: f32,
    /// Forward distance from the car to each probe point
    pub sensor_distance: f32,
    /// Angular offset of the side probes, degrees
    pub sensor_angle: f32,
    /// Half-width of the density sampling window, cells
    pub sensor_half_window: usize,
    pub brush_radius: usize,
    pub cruise_speed: f32,
    /// Speed while driving through sand
    pub sand_speed: f32,
    /// Distance under which the active goal swaps to the other corner
    pub goal_radius: f32,
    /// Heading delta per action id, degrees
    pub rotations: Vec<f32>,
    /// The two alternating goal corners
    pub goals: [(f32, f32); 2],
    pub start: (f32, f32),
    pub gamma: f32,
    pub temperature: f32,
    pub hidden_size: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            width: 500,
            height: 500,
            margin: 10.0,
            sensor_distance: 30.0,
            sensor_angle: 30.0,
            sensor_half_window: 10,
            brush_radius: 10,
            cruise_speed: 6.0,
            sand_speed: 1.0,
            goal_radius: 30.0,
            rotations: vec![0.0, 20.0, -20.0],
            goals: [(20.0, 480.0), (480.0, 20.0)],
            start: (250.0, 250.0),
            gamma: 0.9,
            temperature: 100.0,
            hidden_size: 30,
        }
    }
}

/// Vehicle pose, mutated once per tick by the stepper only.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Car {
    pub x: f32,
    pub y: f32,
    /// Heading in degrees; 0 points along +x
    pub heading: f32,
    pub speed: f32,
}

/// Read-only view of the simulation for the presentation shell.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub sand: ndarray::Array2<f32>,
    pub car_x: f32,
    pub car_y: f32,
    pub car_heading: f32,
    pub goal_x: f32,
    pub goal_y: f32,
    pub last_reward: f32,
    pub score: f32,
}

/// The simulation session: owns the field, the vehicle pose, the alternating
/// goals and the learning agent. Callers hold this handle instead of any
/// process-wide state.
///
/// Single-threaded by design; a shell serving concurrent paint and step
/// requests must serialize access itself.
pub struct Simulation {
    config: SimConfig,
    pub field: SandField,
    pub car: Car,
    pub agent: DqnAgent,
    goal_index: usize,
    last_reward: f32,
    pub(crate) last_distance: f32,
}

impl Simulation {
    /// Build a fresh session from the configuration. The agent starts with
    /// random parameters; call [`Simulation::restore`] for a warm start.
    pub fn new(config: SimConfig) -> Result<Self> {
        let action_count = config.rotations.len();
        if action_count == 0 {
            return Err(PilotError::InvalidParameter {
                name: "rotations".to_string(),
                reason: "At least one action is required".to_string(),
            });
        }
        if (config.margin as usize) < config.sensor_half_window {
            return Err(PilotError::InvalidParameter {
                name: "margin".to_string(),
                reason: "Must cover the sensor window so probes never sample outside the grid"
                    .to_string(),
            });
        }

        // Adam sizes its moment buffers from the layer shapes.
        let layers = vec![
            Layer::new(OBSERVATION_LEN, config.hidden_size, Activation::Relu),
            Layer::new(config.hidden_size, action_count, Activation::Linear),
        ];
        let optimizer = OptimizerWrapper::Adam(Adam::default(&layers));

        let agent = DqnAgentBuilder::new()
            .layer_sizes(&[OBSERVATION_LEN, config.hidden_size, action_count])
            .gamma(config.gamma)
            .temperature(Some(config.temperature))
            .optimizer(optimizer)
            .build()?;

        let field = SandField::new(config.width, config.height, config.brush_radius);
        let car = Car {
            x: config.start.0,
            y: config.start.1,
            heading: 0.0,
            speed: config.cruise_speed,
        };

        Ok(Simulation {
            config,
            field,
            car,
            agent,
            goal_index: 0,
            last_reward: 0.0,
            last_distance: 0.0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Currently active goal position.
    pub fn goal(&self) -> (f32, f32) {
        self.config.goals[self.goal_index]
    }

    /// Reward computed on the most recent tick.
    pub fn last_reward(&self) -> f32 {
        self.last_reward
    }

    /// Mean of the agent's recent rewards.
    pub fn score(&self) -> f32 {
        self.agent.score()
    }

    /// Place the car at a new pose. Resets the progress reference so the
    /// next tick compares against the new position.
    pub fn reset_car(&mut self, x: f32, y: f32, heading: f32) {
        self.car.x = x;
        self.car.y = y;
        self.car.heading = heading;
        self.car.speed = self.config.cruise_speed;
        let (goal_x, goal_y) = self.goal();
        self.last_distance = (x - goal_x).hypot(y - goal_y);
    }

    /// Obstacle density at a probe point offset from the heading by
    /// `offset` degrees. Probes past the margin border read the maximum
    /// density so the agent treats leaving the field as worse than any sand.
    fn probe(&self, offset: f32) -> f32 {
        let angle = (self.car.heading + offset).to_radians();
        let px = self.car.x + self.config.sensor_distance * angle.cos();
        let py = self.car.y + self.config.sensor_distance * angle.sin();

        let margin = self.config.margin;
        let max_x = self.config.width as f32 - margin;
        let max_y = self.config.height as f32 - margin;
        if px < margin || px >= max_x || py < margin || py >= max_y {
            return 1.0;
        }
        self.field
            .density_at(px as usize, py as usize, self.config.sensor_half_window)
    }

    /// Assemble the 5-element observation from the current pose and field:
    /// front/left/right sensor densities, bearing-to-goal normalized to
    /// `[-1, 1]`, and its negation.
    pub fn observation(&self) -> Array1<f32> {
        let (goal_x, goal_y) = self.goal();
        let bearing = (goal_y - self.car.y).atan2(goal_x - self.car.x).to_degrees();
        let orientation = (bearing - self.car.heading) / 180.0;

        let front = self.probe(0.0);
        let left = self.probe(self.config.sensor_angle);
        let right = self.probe(-self.config.sensor_angle);

        array![front, left, right, orientation, -orientation]
    }

    /// Run one simulation/learning step.
    pub fn advance_tick(&mut self) {
        let (goal_x, goal_y) = self.goal();

        // Observation from the pre-action pose; the agent closes the previous
        // transition with the reward computed at the end of the last tick.
        let observation = self.observation();
        let action = self.agent.update(self.last_reward, observation);

        self.car.heading += self.config.rotations[action];

        // Reward is judged before moving: the cell the car currently sits on
        // decides collision, the pre-move distance decides progress.
        let distance = (self.car.x - goal_x).hypot(self.car.y - goal_y);
        let mut reward;
        if self.field.is_sand(self.car.x, self.car.y) {
            self.car.speed = self.config.sand_speed;
            reward = -1.0;
        } else {
            self.car.speed = self.config.cruise_speed;
            reward = -0.2;
            if distance < self.last_distance {
                reward = 0.1;
            }
        }

        let heading_rad = self.car.heading.to_radians();
        self.car.x += self.car.speed * heading_rad.cos();
        self.car.y += self.car.speed * heading_rad.sin();

        // Boundary clamp overrides whatever the reward policy decided.
        let margin = self.config.margin;
        let max_x = self.config.width as f32 - margin;
        let max_y = self.config.height as f32 - margin;
        if self.car.x < margin {
            self.car.x = margin;
            reward = -1.0;
        }
        if self.car.x > max_x {
            self.car.x = max_x;
            reward = -1.0;
        }
        if self.car.y < margin {
            self.car.y = margin;
            reward = -1.0;
        }
        if self.car.y > max_y {
            self.car.y = max_y;
            reward = -1.0;
        }

        if distance < self.config.goal_radius {
            self.goal_index = 1 - self.goal_index;
            debug!(
                "goal reached at distance {:.1}, swapping to {:?}",
                distance,
                self.config.goals[self.goal_index]
            );
        }

        self.last_distance = distance;
        self.last_reward = reward;
    }

    /// Paint sand with the configured brush around `(x, y)`.
    pub fn paint(&mut self, x: i32, y: i32) -> Result<()> {
        self.field.paint(x, y)
    }

    /// Paint sand along the segment between the two points inclusive.
    pub fn paint_segment(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<()> {
        self.field.paint_segment(x1, y1, x2, y2)
    }

    /// Clear the obstacle field.
    pub fn clear(&mut self) {
        self.field.clear();
    }

    /// Read-only snapshot for the presentation shell.
    pub fn snapshot(&self) -> Snapshot {
        let (goal_x, goal_y) = self.goal();
        Snapshot {
            sand: self.field.cells().clone(),
            car_x: self.car.x,
            car_y: self.car.y,
            car_heading: self.car.heading,
            goal_x,
            goal_y,
            last_reward: self.last_reward,
            score: self.score(),
        }
    }

    /// Persist the agent to the given artifact path.
    pub fn save_agent<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.agent.save(&path)?;
        info!("saved brain to {}", path.as_ref().display());
        Ok(())
    }

    /// Warm-start the agent from a saved artifact. A missing file is not an
    /// error: the agent keeps its fresh random parameters.
    pub fn restore<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            info!("no saved brain at {}, starting fresh", path.display());
            return Ok(());
        }
        let agent = DqnAgent::load(path)?;
        if agent.action_count() != self.config.rotations.len() {
            return Err(PilotError::InvalidParameter {
                name: "brain".to_string(),
                reason: format!(
                    "saved agent has {} actions, simulation expects {}",
                    agent.action_count(),
                    self.config.rotations.len()
                ),
            });
        }
        info!("restored brain from {}", path.display());
        self.agent = agent;
        Ok(())
    }
}

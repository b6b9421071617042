use rand::rngs::SmallRng;
use rand::{ Rng, SeedableRng };
use rand_distr::{ Distribution, Normal, StandardNormal };
use tracing::{ debug, trace };

use super::{ arg_max, Arm };
use crate::constants::REWARD_STD_DEV;
use crate::errors::SimulationError;

/// Creates a generator seeded from `seed` when given, or from OS entropy otherwise.
pub fn new_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

/// Generates random number in range: [0; 1)
pub fn generate_uniform_random_number<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen()
}

/// Generates random number in range: [min, max]
pub fn generate_random_number_in_range<R: Rng + ?Sized>(rng: &mut R, min: usize, max: usize) -> usize {
    assert!(min <= max, "Minimum number cannot be bigger than maximum number!");
    rng.gen_range(min..=max)
}

/// Environment of the n-armed bandit problem. Every arm has a true action value
/// drawn from the standard normal distribution that the agent does not know, but
/// is attempting to learn. Pulling an arm returns its true value blurred by
/// normally distributed noise.
#[derive(Debug, Clone)]
pub struct GaussianBanditEnvironment<R: Rng = SmallRng> {
    num_of_arms: usize,
    reward_std_dev: f64,
    /// Index `i` holds the true action value of arm `i + 1`. None until initialized.
    true_action_values: Option<Vec<f64>>,
    most_suitable_action: Option<Arm>,
    rng: R,
}

impl<R: Rng> GaussianBanditEnvironment<R> {
    pub fn new(num_of_arms: usize, rng: R) -> Result<Self, SimulationError> {
        if num_of_arms == 0 {
            return Err(SimulationError::InvalidNumberOfArms);
        }
        Ok(GaussianBanditEnvironment {
            num_of_arms,
            reward_std_dev: REWARD_STD_DEV,
            true_action_values: None,
            most_suitable_action: None,
            rng,
        })
    }

    /// Replaces the standard deviation of the reward noise. Zero makes every
    /// reward equal to the true action value of the pulled arm.
    pub fn with_reward_std_dev(mut self, reward_std_dev: f64) -> Result<Self, SimulationError> {
        if !reward_std_dev.is_finite() || reward_std_dev < 0.0 {
            return Err(SimulationError::InvalidRewardStdDev(reward_std_dev));
        }
        self.reward_std_dev = reward_std_dev;
        Ok(self)
    }

    /// Draws a fresh set of true action values and works out the most suitable action.
    pub fn initialize(&mut self) {
        debug!("Initializing GaussianBanditEnvironment...");
        let true_action_values: Vec<f64> = (0..self.num_of_arms)
            .map(|_| self.rng.sample(StandardNormal))
            .collect();
        self.set_true_action_values(true_action_values);
        debug!("GaussianBanditEnvironment has been initialized.");
    }

    /// Initializes the environment with known true action values instead of drawing them.
    pub fn initialize_with(&mut self, true_action_values: Vec<f64>) -> Result<(), SimulationError> {
        if true_action_values.len() != self.num_of_arms {
            return Err(SimulationError::TrueActionValuesMismatch {
                expected: self.num_of_arms,
                actual: true_action_values.len(),
            });
        }
        self.set_true_action_values(true_action_values);
        Ok(())
    }

    fn set_true_action_values(&mut self, true_action_values: Vec<f64>) {
        debug!(?true_action_values, "True action values");
        self.most_suitable_action = arg_max(&true_action_values);
        debug!(most_suitable_action = ?self.most_suitable_action, "Most suitable action");
        self.true_action_values = Some(true_action_values);
    }

    /// Pulls `arm` and returns a reward drawn from N(true value, reward_std_dev^2).
    pub fn step(&mut self, arm: Arm) -> Result<f64, SimulationError> {
        let true_action_values = self.true_action_values
            .as_ref()
            .ok_or(SimulationError::EnvironmentNotInitialized)?;
        if !(1..=self.num_of_arms).contains(&arm) {
            return Err(SimulationError::ArmOutOfRange { arm, num_of_arms: self.num_of_arms });
        }
        let distribution = Normal::new(true_action_values[arm - 1], self.reward_std_dev).map_err(
            |_| SimulationError::InvalidRewardStdDev(self.reward_std_dev)
        )?;
        let reward = distribution.sample(&mut self.rng);
        trace!(arm, reward, "Selected arm index");
        Ok(reward)
    }

    pub fn num_of_arms(&self) -> usize {
        self.num_of_arms
    }

    pub fn arms(&self) -> impl Iterator<Item = Arm> {
        1..=self.num_of_arms
    }

    pub fn is_initialized(&self) -> bool {
        self.true_action_values.is_some()
    }

    /// Added ONLY for purposes of collecting statistics about the simulation.
    /// The agent never looks at these values.
    pub fn true_action_values(&self) -> Option<&[f64]> {
        self.true_action_values.as_deref()
    }

    pub fn most_suitable_action(&self) -> Option<Arm> {
        self.most_suitable_action
    }

    pub fn reward_std_dev(&self) -> f64 {
        self.reward_std_dev
    }
}

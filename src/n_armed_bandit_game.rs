use std::collections::BTreeMap;
use std::path::Path;

use rand::rngs::SmallRng;
use rand::Rng;
use tracing::{ trace, warn };

use crate::environments::{
    arg_max,
    generate_random_number_in_range,
    generate_uniform_random_number,
    Arm,
    GaussianBanditEnvironment,
};
use crate::errors::SimulationError;
use crate::play_logger::{ PlayLogger, PlayRecord };

/// Rejects exploratory rates outside [0, 1]. NaN is rejected as well.
pub fn validate_exploratory_rate(exploratory_rate: f64) -> Result<f64, SimulationError> {
    if (0.0..=1.0).contains(&exploratory_rate) {
        Ok(exploratory_rate)
    } else {
        Err(SimulationError::InvalidExploratoryRate(exploratory_rate))
    }
}

/// This agent represents a solution to the n-armed bandit problem with the
/// epsilon-greedy policy. The agent is faced with several arms and must learn
/// which of them gives the largest reward on average. What the agent has learned
/// is never stored on its own: every estimate is recomputed from the play log.
#[derive(Debug)]
pub struct NArmedBanditAgent<R: Rng = SmallRng> {
    /// The environment holds the true action values the agent does not know.
    environment: GaussianBanditEnvironment<R>,
    /// Number of plays taken so far. The first play is 1.
    play_count: usize,
    /// Records action taken and reward received on each play.
    play_log: PlayLogger,
    /// Exploratory rate of the latest play.
    exploratory_rate: Option<f64>,
    rng: R,
}

impl<R: Rng> NArmedBanditAgent<R> {
    /// Binds a new agent to an initialized environment. The most suitable action
    /// goes to the play log only, the policy never looks at it.
    pub fn new(environment: GaussianBanditEnvironment<R>, rng: R) -> Result<Self, SimulationError> {
        if !environment.is_initialized() {
            return Err(SimulationError::EnvironmentNotInitialized);
        }
        let mut play_log = PlayLogger::new();
        play_log.set_most_suitable_action(environment.most_suitable_action());
        Ok(NArmedBanditAgent {
            environment,
            play_count: 0,
            play_log,
            exploratory_rate: None,
            rng,
        })
    }

    /// Epsilon-greedy selection. The very first play is always exploratory,
    /// after that a random action is taken with probability `exploratory_rate`.
    pub fn select_policy(&mut self, exploratory_rate: f64) -> Result<Arm, SimulationError> {
        let exploratory_rate = validate_exploratory_rate(exploratory_rate)?;
        let is_exploratory =
            generate_uniform_random_number(&mut self.rng) < exploratory_rate ||
            self.play_count == 1;
        let action = if is_exploratory {
            self.select_policy_exploratory()
        } else {
            self.select_policy_greedy()
        };
        trace!(action, is_exploratory, "Selected action");
        Ok(action)
    }

    /// Any arm, the current best one included, with equal probability.
    pub fn select_policy_exploratory(&mut self) -> Arm {
        generate_random_number_in_range(&mut self.rng, 1, self.environment.num_of_arms())
    }

    /// The arm with the largest estimate. Ties go to the arm with the lowest number.
    pub fn select_policy_greedy(&self) -> Arm {
        let estimated_action_values: Vec<f64> = self
            .estimate_action_values()
            .into_values()
            .collect();
        // Estimates cover every arm and there is at least one arm.
        arg_max(&estimated_action_values).unwrap_or(1)
    }

    /// Sample average of every reward received so far for each arm. Arms that
    /// were never played are estimated at 0.
    pub fn estimate_action_values(&self) -> BTreeMap<Arm, f64> {
        let rewards_by_action = self.play_log.rewards_by_action();
        let estimated_action_values: BTreeMap<Arm, f64> = self.environment
            .arms()
            .map(|arm| {
                let estimate = match rewards_by_action.get(&arm) {
                    Some(rewards) if !rewards.is_empty() => {
                        rewards.iter().sum::<f64>() / (rewards.len() as f64)
                    }
                    _ => 0.0,
                };
                (arm, estimate)
            })
            .collect();
        trace!(?estimated_action_values, "Estimated action values");
        estimated_action_values
    }

    fn receive_reward(
        &mut self,
        action: Arm,
        reward: f64,
        exploratory_rate: f64
    ) -> Result<&PlayRecord, SimulationError> {
        self.play_log.register(self.play_count, action, reward, exploratory_rate)
    }

    /// Takes one turn: select an arm, pull it and log the reward.
    pub fn play(&mut self, exploratory_rate: f64) -> Result<PlayRecord, SimulationError> {
        let exploratory_rate = validate_exploratory_rate(exploratory_rate)?;
        self.play_count += 1;
        self.exploratory_rate = Some(exploratory_rate);
        trace!(play_count = self.play_count, exploratory_rate, "Play counts");

        let action = self.select_policy(exploratory_rate)?;
        let reward = self.environment.step(action)?;
        trace!(reward, "Reward");
        self.receive_reward(action, reward, exploratory_rate).cloned()
    }

    /// Plays `num_of_plays` turns in a row with the same exploratory rate.
    pub fn run(&mut self, num_of_plays: usize, exploratory_rate: f64) -> Result<(), SimulationError> {
        let exploratory_rate = validate_exploratory_rate(exploratory_rate)?;
        if exploratory_rate == 0.0 {
            warn!("The greedy policy will be selected after the first play.");
        }
        if exploratory_rate == 1.0 {
            warn!("The exploratory policy will be selected on every play.");
        }
        for _ in 0..num_of_plays {
            self.play(exploratory_rate)?;
        }
        Ok(())
    }

    pub fn write_logs_to_csv(&self, path: &Path) -> Result<(), SimulationError> {
        self.play_log.write_logs_to_csv(path)
    }

    pub fn play_count(&self) -> usize {
        self.play_count
    }

    pub fn exploratory_rate(&self) -> Option<f64> {
        self.exploratory_rate
    }

    pub fn play_log(&self) -> &PlayLogger {
        &self.play_log
    }

    pub fn into_play_log(self) -> PlayLogger {
        self.play_log
    }

    pub fn environment(&self) -> &GaussianBanditEnvironment<R> {
        &self.environment
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::environments::new_rng;

    const SEED: u64 = 1234;

    fn new_agent(num_of_arms: usize) -> NArmedBanditAgent {
        let mut environment = GaussianBanditEnvironment::new(num_of_arms, new_rng(Some(SEED))).unwrap();
        environment.initialize();
        NArmedBanditAgent::new(environment, new_rng(Some(SEED + 1))).unwrap()
    }

    fn new_deterministic_agent(true_action_values: Vec<f64>, seed: u64) -> NArmedBanditAgent {
        let mut environment = GaussianBanditEnvironment::new(
            true_action_values.len(),
            new_rng(Some(seed))
        )
            .unwrap()
            .with_reward_std_dev(0.0)
            .unwrap();
        environment.initialize_with(true_action_values).unwrap();
        NArmedBanditAgent::new(environment, new_rng(Some(seed + 1))).unwrap()
    }

    #[test]
    fn test_creation_of_agent() {
        let agent = new_agent(10);

        assert_eq!(agent.play_count(), 0);
        assert!(agent.play_log().is_empty());
        assert!(agent.exploratory_rate().is_none());
        assert_eq!(
            agent.play_log().most_suitable_action(),
            agent.environment().most_suitable_action()
        );
    }

    #[test]
    fn test_agent_on_uninitialized_environment_fails() {
        let environment = GaussianBanditEnvironment::new(10, new_rng(Some(SEED))).unwrap();

        let result = NArmedBanditAgent::new(environment, new_rng(Some(SEED)));

        assert!(matches!(result, Err(SimulationError::EnvironmentNotInitialized)));
    }

    #[test]
    fn test_invalid_exploratory_rate_is_rejected() {
        let mut agent = new_agent(10);

        for exploratory_rate in [-0.1, 1.1, f64::NAN] {
            assert!(
                matches!(
                    agent.select_policy(exploratory_rate),
                    Err(SimulationError::InvalidExploratoryRate(_))
                )
            );
            assert!(
                matches!(
                    agent.play(exploratory_rate),
                    Err(SimulationError::InvalidExploratoryRate(_))
                )
            );
        }
        assert_eq!(agent.play_count(), 0, "Rejected plays must not be counted");
        assert!(agent.play_log().is_empty());
    }

    #[test]
    fn test_random_action_within_the_range_returned() {
        let mut agent = new_agent(10);

        for _ in 0..10_000 {
            let action = agent.select_policy_exploratory();
            assert!((1..=10).contains(&action));
        }
    }

    #[test]
    fn test_random_actions_are_uniform() {
        let num_of_arms = 5;
        let turns = 50_000;
        let mut agent = new_agent(num_of_arms);
        let mut frequency = vec![0usize; num_of_arms];

        for _ in 0..turns {
            frequency[agent.select_policy_exploratory() - 1] += 1;
        }

        let expected = (turns / num_of_arms) as f64;
        for (index, count) in frequency.iter().enumerate() {
            assert!(
                ((*count as f64) - expected).abs() < expected * 0.05,
                "Arm {} was explored {} times, expected about {}",
                index + 1,
                count,
                expected
            );
        }
    }

    #[test]
    fn test_estimates_are_zero_before_any_play() {
        let agent = new_agent(4);

        let estimates = agent.estimate_action_values();

        assert_eq!(estimates.len(), 4);
        assert!(estimates.values().all(|&value| value == 0.0));
    }

    #[test]
    fn test_estimates_equal_naive_mean_of_play_log() {
        let mut agent = new_agent(5);
        agent.run(500, 0.5).unwrap();

        let estimates = agent.estimate_action_values();

        for arm in 1..=5 {
            let rewards: Vec<f64> = agent
                .play_log()
                .records()
                .iter()
                .filter(|record| record.action == arm)
                .map(|record| record.reward)
                .collect();
            let expected = if rewards.is_empty() {
                0.0
            } else {
                rewards.iter().sum::<f64>() / (rewards.len() as f64)
            };
            assert_relative_eq!(estimates[&arm], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_greedy_policy_when_one_value_is_the_best() {
        let mut agent = new_deterministic_agent(vec![0.0, 0.9, 0.1], SEED);
        // Play every arm once by hand so that the estimates equal the true values.
        for arm in 1..=3 {
            agent.play_count += 1;
            let reward = agent.environment.step(arm).unwrap();
            agent.receive_reward(arm, reward, 0.0).unwrap();
        }

        assert_eq!(agent.select_policy_greedy(), 2);
    }

    #[test]
    fn test_greedy_policy_ties_go_to_first_arm() {
        let mut agent = new_deterministic_agent(vec![0.9, 0.0, 0.9], SEED);
        for arm in [3, 1] {
            agent.play_count += 1;
            let reward = agent.environment.step(arm).unwrap();
            agent.receive_reward(arm, reward, 0.0).unwrap();
        }

        assert_eq!(agent.select_policy_greedy(), 1);
    }

    #[test]
    fn test_greedy_policy_before_any_play_picks_first_arm() {
        let agent = new_agent(10);

        assert_eq!(agent.select_policy_greedy(), 1);
    }

    #[test]
    fn test_zero_exploratory_rate_is_greedy_after_first_play() {
        for seed in 0..20 {
            let mut agent = new_agent_with_seed(10, seed);
            agent.play(0.0).unwrap();

            for _ in 0..50 {
                let expected = agent.select_policy_greedy();
                let record = agent.play(0.0).unwrap();
                assert_eq!(record.action, expected, "Greedy action expected after the first play");
            }
        }
    }

    fn new_agent_with_seed(num_of_arms: usize, seed: u64) -> NArmedBanditAgent {
        let mut environment = GaussianBanditEnvironment::new(num_of_arms, new_rng(Some(seed))).unwrap();
        environment.initialize();
        NArmedBanditAgent::new(environment, new_rng(Some(seed.wrapping_add(1_000)))).unwrap()
    }

    #[test]
    fn test_full_exploratory_rate_explores_every_arm() {
        let mut agent = new_deterministic_agent(vec![5.0, 0.0, 0.0, 0.0], SEED);

        agent.run(2_000, 1.0).unwrap();

        let rewards_by_action = agent.play_log().rewards_by_action();
        assert_eq!(rewards_by_action.len(), 4);
        let best_count = rewards_by_action[&1].len();
        assert!(
            (400..600).contains(&best_count),
            "Best arm chosen {} times with exploratory rate 1",
            best_count
        );
    }

    #[test]
    fn test_play_records_are_numbered_from_one() {
        let mut agent = new_agent(10);

        agent.run(25, 0.1).unwrap();

        assert_eq!(agent.play_count(), 25);
        assert_eq!(agent.exploratory_rate(), Some(0.1));
        assert_eq!(agent.play_log().play_counts(), (1..=25).collect::<Vec<_>>());
        for record in agent.play_log().records() {
            assert_eq!(Some(record.most_suitable_action), agent.environment().most_suitable_action());
            assert_eq!(record.exploratory_rate, 0.1);
        }
    }

    #[test]
    fn test_two_arms_without_noise_and_greedy_policy() {
        for seed in 0..20 {
            let mut agent = new_deterministic_agent(vec![10.0, -10.0], seed);

            agent.run(3, 0.0).unwrap();

            let records = agent.play_log().records();
            assert!([1, 2].contains(&records[0].action));
            assert_eq!(records[1].action, 1);
            assert_eq!(records[2].action, 1);
            assert_eq!(records[2].reward, 10.0);
            assert_eq!(records[2].most_suitable_action, 1);
        }
    }

    #[test]
    fn test_agent_learns_best_arm() {
        let mut agent = new_deterministic_agent(vec![0.2, 1.5, -0.3, 0.7], SEED);

        agent.run(1_000, 0.1).unwrap();

        let suitable = agent
            .play_log()
            .records()
            .iter()
            .filter(|record| record.is_suitable_action())
            .count();
        assert!(suitable > 700, "Best arm chosen only {} times out of 1000", suitable);
    }
}

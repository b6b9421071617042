pub mod gaussian_bandit;

pub use gaussian_bandit::{
    generate_random_number_in_range,
    generate_uniform_random_number,
    new_rng,
    GaussianBanditEnvironment,
};

/// Arms are numbered from 1 to the number of arms.
pub type Arm = usize;

/// Returns the arm holding the largest value. When several arms share the
/// largest value, the one with the lowest number wins.
pub fn arg_max(values: &[f64]) -> Option<Arm> {
    let mut best: Option<(usize, f64)> = None;
    for (index, &value) in values.iter().enumerate() {
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => {
                best = Some((index, value));
            }
        }
    }
    best.map(|(index, _)| index + 1)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_arg_max_returns_one_based_arm() {
        assert_eq!(arg_max(&[0.1, 0.9, 0.3]), Some(2));
    }

    #[test]
    fn test_arg_max_ties_resolved_by_first_occurrence() {
        assert_eq!(arg_max(&[0.0, 0.7, 0.7, 0.7]), Some(2));
        assert_eq!(arg_max(&[0.0, 0.0, 0.0]), Some(1));
    }

    #[test]
    fn test_arg_max_of_empty_values() {
        assert_eq!(arg_max(&[]), None);
    }

    #[test]
    fn test_arg_max_with_negative_values() {
        assert_eq!(arg_max(&[-3.0, -1.5, -2.0]), Some(2));
    }
}

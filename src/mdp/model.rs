use crate::utils::error::MdpError;
use std::fmt;

pub type Matrix<T> = Vec<Vec<T>>;
pub type Matrix3D<T> = Vec<Vec<Vec<T>>>;

/// 轉移機率列總和允許的誤差
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-4;

/// 馬可夫決策過程的公開資訊：可用動作、轉移核與 Bernoulli 獎勵機率。
///
/// - `actions[x]`：狀態 `x` 可選的動作
/// - `transitions[x][a][y]`：p(y | x, a)
/// - `rewards[x][a]`：R(x, a) ~ B(rewards[x][a])
#[derive(Debug, Clone, PartialEq)]
pub struct MdpModel {
    actions: Matrix<usize>,
    transitions: Matrix3D<f64>,
    rewards: Matrix<f64>,
}

impl MdpModel {
    pub fn new(
        actions: Matrix<usize>,
        transitions: Matrix3D<f64>,
        rewards: Matrix<f64>,
    ) -> Result<Self, MdpError> {
        let model = Self {
            actions,
            transitions,
            rewards,
        };
        model.check()?;
        Ok(model)
    }

    fn check(&self) -> Result<(), MdpError> {
        let n = self.transitions.len();
        if n == 0 {
            return Err(MdpError::ShapeMismatch {
                what: "transitions".to_string(),
                expected: 1,
                found: 0,
            });
        }
        let a = self.transitions[0].len();

        for (what, found) in [("actions", self.actions.len()), ("rewards", self.rewards.len())] {
            if found != n {
                return Err(MdpError::ShapeMismatch {
                    what: what.to_string(),
                    expected: n,
                    found,
                });
            }
        }

        for x in 0..n {
            if self.transitions[x].len() != a {
                return Err(MdpError::ShapeMismatch {
                    what: format!("transitions[{}]", x),
                    expected: a,
                    found: self.transitions[x].len(),
                });
            }
            if self.rewards[x].len() != a {
                return Err(MdpError::ShapeMismatch {
                    what: format!("rewards[{}]", x),
                    expected: a,
                    found: self.rewards[x].len(),
                });
            }
            for (action, row) in self.transitions[x].iter().enumerate() {
                if row.len() != n {
                    return Err(MdpError::ShapeMismatch {
                        what: format!("transitions[{}][{}]", x, action),
                        expected: n,
                        found: row.len(),
                    });
                }
                if let Some(&value) = row.iter().find(|p| !(0.0..=1.0).contains(*p)) {
                    return Err(MdpError::InvalidChance {
                        what: "transition chance",
                        state: x,
                        action,
                        value,
                    });
                }
            }
            for (action, &chance) in self.rewards[x].iter().enumerate() {
                if !(0.0..=1.0).contains(&chance) {
                    return Err(MdpError::InvalidChance {
                        what: "reward chance",
                        state: x,
                        action,
                        value: chance,
                    });
                }
            }

            if self.actions[x].is_empty() {
                return Err(MdpError::NoAvailableActions { state: x });
            }
            for &action in &self.actions[x] {
                if action >= a {
                    return Err(MdpError::OutOfRange(format!(
                        "action {} available from state {} but only {} actions exist",
                        action, x, a
                    )));
                }
                // 只有可用動作的列必須是機率分佈
                let sum: f64 = self.transitions[x][action].iter().sum();
                if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
                    return Err(MdpError::InvalidDistribution {
                        state: x,
                        action,
                        sum,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn states(&self) -> usize {
        self.transitions.len()
    }

    pub fn max_action(&self) -> usize {
        self.transitions[0].len()
    }

    pub fn actions(&self) -> &Matrix<usize> {
        &self.actions
    }

    pub fn available_actions(&self, x: usize) -> Result<&[usize], MdpError> {
        self.actions
            .get(x)
            .map(Vec::as_slice)
            .ok_or_else(|| MdpError::OutOfRange(format!("state {}", x)))
    }

    pub fn is_available(&self, x: usize, action: usize) -> bool {
        self.actions
            .get(x)
            .is_some_and(|actions| actions.contains(&action))
    }

    /// 狀態-動作對的獎勵機率
    pub fn reward(&self, x: usize, action: usize) -> Result<f64, MdpError> {
        self.rewards
            .get(x)
            .and_then(|row| row.get(action))
            .copied()
            .ok_or_else(|| MdpError::OutOfRange(format!("reward ({}, {})", x, action)))
    }

    /// p(y | x, action)
    pub fn transition_chance(&self, x: usize, action: usize, y: usize) -> Result<f64, MdpError> {
        self.transitions
            .get(x)
            .and_then(|rows| rows.get(action))
            .and_then(|row| row.get(y))
            .copied()
            .ok_or_else(|| MdpError::OutOfRange(format!("transition ({}, {}, {})", x, action, y)))
    }

    pub(crate) fn transition_row(&self, x: usize, action: usize) -> &[f64] {
        &self.transitions[x][action]
    }

    pub fn transition_kernel(&self) -> &Matrix3D<f64> {
        &self.transitions
    }

    pub fn reward_matrix(&self) -> &Matrix<f64> {
        &self.rewards
    }
}

impl fmt::Display for MdpModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.states();
        writeln!(
            f,
            "Showing MDP with {} states and {} actions",
            n,
            self.max_action()
        )?;
        writeln!(f)?;

        writeln!(f, "Actions:")?;
        let mut max_action = 0;
        for (x, actions) in self.actions.iter().enumerate() {
            write!(f, "- {}: ", x)?;
            for &action in actions {
                write!(f, "{} ", action)?;
                max_action = max_action.max(action);
            }
            writeln!(f)?;
        }
        writeln!(f)?;

        writeln!(f, "Transitions:")?;
        for action in 0..=max_action {
            writeln!(f, "   [Showing transition matrix for action {}]", action)?;
            for x in 0..n {
                for y in 0..n {
                    write!(f, "{:>8} ", self.transitions[x][action][y])?;
                }
                writeln!(f)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;

        writeln!(f, "Rewards:")?;
        for x in 0..n {
            write!(f, "  For state {}: ", x)?;
            for action in 0..=max_action {
                write!(f, "{:>8} ", self.rewards[x][action])?;
            }
            writeln!(f)?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state_model() -> MdpModel {
        MdpModel::new(
            vec![vec![0, 1], vec![0]],
            vec![
                vec![vec![1.0, 0.0], vec![0.2, 0.8]],
                vec![vec![0.5, 0.5], vec![0.0, 0.0]],
            ],
            vec![vec![0.0, 0.3], vec![1.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let model = two_state_model();
        assert_eq!(model.states(), 2);
        assert_eq!(model.max_action(), 2);
        assert_eq!(model.available_actions(0).unwrap(), &[0, 1]);
        assert_eq!(model.reward(0, 1).unwrap(), 0.3);
        assert_eq!(model.transition_chance(0, 1, 1).unwrap(), 0.8);
        assert!(model.is_available(1, 0));
        assert!(!model.is_available(1, 1));
    }

    #[test]
    fn test_out_of_range_lookups() {
        let model = two_state_model();
        assert!(matches!(model.reward(2, 0), Err(MdpError::OutOfRange(_))));
        assert!(matches!(model.transition_chance(0, 2, 0), Err(MdpError::OutOfRange(_))));
        assert!(matches!(model.transition_chance(0, 0, 5), Err(MdpError::OutOfRange(_))));
        assert!(model.available_actions(9).is_err());
    }

    #[test]
    fn test_unavailable_action_row_may_be_zero() {
        // 狀態 1 的動作 1 不可用，其轉移列全為 0 仍然合法
        let model = two_state_model();
        assert_eq!(model.transition_kernel()[1][1], vec![0.0, 0.0]);
    }

    #[test]
    fn test_rejects_row_not_summing_to_one() {
        let err = MdpModel::new(
            vec![vec![0]],
            vec![vec![vec![0.7]]],
            vec![vec![0.0]],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MdpError::InvalidDistribution { state: 0, action: 0, .. }
        ));
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let err = MdpModel::new(
            vec![vec![0], vec![0]],
            vec![vec![vec![1.0]]],
            vec![vec![0.0]],
        )
        .unwrap_err();
        assert!(matches!(err, MdpError::ShapeMismatch { .. }));

        let err = MdpModel::new(vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, MdpError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_rejects_bad_chances_and_actions() {
        let err = MdpModel::new(
            vec![vec![0]],
            vec![vec![vec![1.0]]],
            vec![vec![1.5]],
        )
        .unwrap_err();
        assert!(matches!(err, MdpError::InvalidChance { what: "reward chance", .. }));

        let err = MdpModel::new(
            vec![vec![3]],
            vec![vec![vec![1.0]]],
            vec![vec![0.0]],
        )
        .unwrap_err();
        assert!(matches!(err, MdpError::OutOfRange(_)));

        let err = MdpModel::new(
            vec![vec![]],
            vec![vec![vec![1.0]]],
            vec![vec![0.0]],
        )
        .unwrap_err();
        assert_eq!(err, MdpError::NoAvailableActions { state: 0 });
    }

    #[test]
    fn test_display_lists_every_section() {
        let shown = two_state_model().to_string();
        assert!(shown.starts_with("Showing MDP with 2 states and 2 actions"));
        assert!(shown.contains("- 0: 0 1 "));
        assert!(shown.contains("[Showing transition matrix for action 1]"));
        assert!(shown.contains("  For state 1: "));
    }
}

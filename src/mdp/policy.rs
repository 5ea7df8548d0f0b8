use crate::utils::error::MdpError;
use std::fmt;

/// 可能隨時間變化的決策規則：`steps[t % len][state]` 為時間 `t` 於 `state` 選擇的動作。
/// 只有一步的策略即為穩態策略。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Policy {
    steps: Vec<Vec<usize>>,
}

impl Policy {
    pub fn new(steps: Vec<Vec<usize>>) -> Self {
        Self { steps }
    }

    pub fn stationary(actions: Vec<usize>) -> Self {
        Self {
            steps: vec![actions],
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn action(&self, state: usize, t: usize) -> Result<usize, MdpError> {
        if self.steps.is_empty() {
            return Err(MdpError::EmptyPolicy);
        }
        let rule = &self.steps[t % self.steps.len()];
        rule.get(state).copied().ok_or_else(|| {
            MdpError::OutOfRange(format!("policy has no action for state {}", state))
        })
    }

    pub fn steps(&self) -> &[Vec<usize>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_stationary(&self) -> bool {
        self.steps.len() == 1
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.steps.len();
        match total {
            0 => return write!(f, "Asking to show empty policy, discarding"),
            1 => write!(f, "Showing stationary policy: ")?,
            _ => writeln!(f, "Showing policy with {} steps:", total)?,
        }

        for (t, rule) in self.steps.iter().enumerate() {
            write!(f, "({}/{}) ", t + 1, total)?;
            for action in rule {
                write!(f, " {}", action)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

use crate::mdp::policy::Policy;
use crate::mdp::process::Environment;
use crate::utils::error::MdpError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// 單步行動的結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub action: usize,
    pub reward: f64,
}

/// 在環境中執行策略（或隨機行動）的代理
pub struct Agent<'a, E: Environment> {
    env: &'a mut E,
    policy: &'a Policy,
    rng: StdRng,
}

impl<'a, E: Environment> Agent<'a, E> {
    pub fn new(env: &'a mut E, policy: &'a Policy) -> Self {
        Self {
            env,
            policy,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(env: &'a mut E, policy: &'a Policy, seed: u64) -> Self {
        Self {
            env,
            policy,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn env(&self) -> &E {
        &*self.env
    }

    pub fn policy(&self) -> &Policy {
        self.policy
    }

    /// 從目前狀態的可用動作中均勻選一個並執行
    pub fn make_random_action(&mut self) -> Result<Step, MdpError> {
        let state = self.env.state();
        let action = *self
            .env
            .available_actions()
            .choose(&mut self.rng)
            .ok_or(MdpError::NoAvailableActions { state })?;
        let reward = self.env.make_action(action)?;
        Ok(Step { action, reward })
    }

    /// 依策略在 (state, time) 選擇動作並執行一步
    pub fn use_policy(&mut self) -> Result<Step, MdpError> {
        let action = self.policy.action(self.env.state(), self.env.time())?;
        let reward = self.env.make_action(action)?;
        Ok(Step { action, reward })
    }
}

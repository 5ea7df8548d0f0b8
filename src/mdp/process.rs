use crate::mdp::model::{Matrix, Matrix3D, MdpModel};
use crate::utils::error::MdpError;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Arc;

/// 強化學習代理可觀察的介面：只能行動並看到狀態與獎勵，看不到轉移核與獎勵機率
pub trait Environment {
    /// 執行 `action`，回傳本步獲得的獎勵
    fn make_action(&mut self, action: usize) -> Result<f64, MdpError>;
    fn state(&self) -> usize;
    fn states(&self) -> usize;
    fn max_action(&self) -> usize;
    fn time(&self) -> usize;
    /// 目前狀態可用的動作
    fn available_actions(&self) -> &[usize];
    fn discount(&self) -> f64;
    fn total_rewards(&self) -> f64;
}

/// 隱藏資訊的 MDP 模擬器，獎勵為 Bernoulli 分佈
pub struct Mdp {
    model: Arc<MdpModel>,
    discount: f64,
    state: usize,
    t: usize,
    max_reward: f64,
    total_rewards: f64,
    rng: StdRng,
}

impl Mdp {
    pub fn new(model: impl Into<Arc<MdpModel>>, discount: f64) -> Result<Self, MdpError> {
        Self::with_rng(model.into(), discount, StdRng::from_entropy())
    }

    /// 固定亂數種子，模擬結果可重現
    pub fn with_seed(
        model: impl Into<Arc<MdpModel>>,
        discount: f64,
        seed: u64,
    ) -> Result<Self, MdpError> {
        Self::with_rng(model.into(), discount, StdRng::seed_from_u64(seed))
    }

    fn with_rng(model: Arc<MdpModel>, discount: f64, rng: StdRng) -> Result<Self, MdpError> {
        if !(discount > 0.0 && discount <= 1.0) {
            return Err(MdpError::InvalidParameter {
                name: "discount",
                reason: format!("{} is not in (0, 1]", discount),
            });
        }
        Ok(Self {
            model,
            discount,
            state: 0,
            t: 0,
            max_reward: 1.0,
            total_rewards: 0.0,
            rng,
        })
    }

    pub fn actions(&self) -> &Matrix<usize> {
        self.model.actions()
    }

    pub fn available_actions_at(&self, x: usize) -> Result<&[usize], MdpError> {
        self.model.available_actions(x)
    }
}

impl Environment for Mdp {
    fn make_action(&mut self, action: usize) -> Result<f64, MdpError> {
        if !self.model.is_available(self.state, action) {
            return Err(MdpError::IllegalAction {
                state: self.state,
                action,
            });
        }

        self.t += 1;

        let chances = self.model.transition_row(self.state, action);
        let next_state = WeightedIndex::new(chances)
            .map_err(|_| MdpError::InvalidDistribution {
                state: self.state,
                action,
                sum: chances.iter().sum(),
            })?
            .sample(&mut self.rng);

        let chance = self.model.reward_matrix()[self.state][action];
        let reward = if self.rng.gen::<f64>() < chance {
            self.max_reward
        } else {
            0.0
        };

        self.total_rewards += reward;
        self.max_reward *= self.discount;
        self.state = next_state;
        Ok(reward)
    }

    fn state(&self) -> usize {
        self.state
    }

    fn states(&self) -> usize {
        self.model.states()
    }

    fn max_action(&self) -> usize {
        self.model.max_action()
    }

    fn time(&self) -> usize {
        self.t
    }

    fn available_actions(&self) -> &[usize] {
        &self.model.actions()[self.state]
    }

    fn discount(&self) -> f64 {
        self.discount
    }

    fn total_rewards(&self) -> f64 {
        self.total_rewards
    }
}

/// 公開轉移核與獎勵機率的 MDP，供規劃演算法使用
pub struct OfflineMdp {
    mdp: Mdp,
}

impl OfflineMdp {
    pub fn new(model: impl Into<Arc<MdpModel>>, discount: f64) -> Result<Self, MdpError> {
        Ok(Self {
            mdp: Mdp::new(model, discount)?,
        })
    }

    pub fn with_seed(
        model: impl Into<Arc<MdpModel>>,
        discount: f64,
        seed: u64,
    ) -> Result<Self, MdpError> {
        Ok(Self {
            mdp: Mdp::with_seed(model, discount, seed)?,
        })
    }

    pub fn model(&self) -> &MdpModel {
        &self.mdp.model
    }

    pub fn reward(&self, x: usize, action: usize) -> Result<f64, MdpError> {
        self.mdp.model.reward(x, action)
    }

    pub fn transition_chance(&self, x: usize, action: usize, y: usize) -> Result<f64, MdpError> {
        self.mdp.model.transition_chance(x, action, y)
    }

    pub fn transition_kernel(&self) -> &Matrix3D<f64> {
        self.mdp.model.transition_kernel()
    }

    pub fn reward_matrix(&self) -> &Matrix<f64> {
        self.mdp.model.reward_matrix()
    }

    /// 模擬器本身（隱藏資訊視角）
    pub fn simulator(&mut self) -> &mut Mdp {
        &mut self.mdp
    }

    pub fn into_simulator(self) -> Mdp {
        self.mdp
    }
}

impl Environment for OfflineMdp {
    fn make_action(&mut self, action: usize) -> Result<f64, MdpError> {
        self.mdp.make_action(action)
    }

    fn state(&self) -> usize {
        self.mdp.state()
    }

    fn states(&self) -> usize {
        self.mdp.states()
    }

    fn max_action(&self) -> usize {
        self.mdp.max_action()
    }

    fn time(&self) -> usize {
        self.mdp.time()
    }

    fn available_actions(&self) -> &[usize] {
        self.mdp.available_actions()
    }

    fn discount(&self) -> f64 {
        self.mdp.discount()
    }

    fn total_rewards(&self) -> f64 {
        self.mdp.total_rewards()
    }
}

impl fmt::Display for OfflineMdp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.model().fmt(f)
    }
}

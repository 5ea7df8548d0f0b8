//! 平均獎勵準則下的規劃演算法與不變測度。

use crate::mdp::agent::Agent;
use crate::mdp::model::MdpModel;
use crate::mdp::policy::Policy;
use crate::mdp::process::Environment;
use crate::utils::error::MdpError;
use crate::utils::progress::LoadingBar;

/// 計算精確不變測度時使用的值迭代上限與精度
pub const INVARIANT_MAX_STEPS: usize = 1_000_000;
pub const INVARIANT_EPS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct ValueIteration {
    /// 收斂時的貪婪穩態策略
    pub policy: Policy,
    /// 平均獎勵（gain）估計值
    pub gain: f64,
    /// 以狀態 0 正規化後的相對價值（bias）
    pub bias: Vec<f64>,
    pub iterations: usize,
}

/// 相對值迭代：反覆套用 Bellman 運算子直到 `w - v` 的 span 小於 `eps`。
///
/// 每一輪後以 `v[0]` 正規化，避免價值無限成長。收斂時 gain 取差值上下界的中點。
pub fn value_iteration(
    model: &MdpModel,
    max_steps: usize,
    eps: f64,
) -> Result<ValueIteration, MdpError> {
    if !(eps > 0.0) {
        return Err(MdpError::InvalidEpsilon(eps));
    }

    let n = model.states();
    let mut v = vec![0.0; n];
    let mut w = vec![0.0; n];
    let mut best_action = vec![0; n];

    for t in 0..max_steps {
        // w = T v
        for x in 0..n {
            let mut max_q = f64::NEG_INFINITY;
            for &action in &model.actions()[x] {
                let q = model.reward_matrix()[x][action]
                    + model
                        .transition_row(x, action)
                        .iter()
                        .zip(&v)
                        .map(|(p, vy)| p * vy)
                        .sum::<f64>();
                if q > max_q {
                    max_q = q;
                    best_action[x] = action;
                }
            }
            w[x] = max_q;
        }

        let mut max_dv = f64::NEG_INFINITY;
        let mut min_dv = f64::INFINITY;
        for x in 0..n {
            let dv = w[x] - v[x];
            max_dv = max_dv.max(dv);
            min_dv = min_dv.min(dv);
        }

        let w0 = w[0];
        for x in 0..n {
            v[x] = w[x] - w0;
        }

        if max_dv - min_dv < eps {
            return Ok(ValueIteration {
                policy: Policy::stationary(best_action),
                gain: (max_dv + min_dv) / 2.0,
                bias: v,
                iterations: t + 1,
            });
        }
    }

    Err(MdpError::NotConverged { max_steps })
}

/// 以值迭代求策略的不變測度。
///
/// 對每個狀態 `x`，把動作限制為策略的選擇，並只在 `(x, policy(x))` 給予獎勵 1，
/// 此時的 gain 即為長期停留在 `x` 的比例。
pub fn invariant_measure(model: &MdpModel, policy: &Policy) -> Result<Vec<f64>, MdpError> {
    let n = model.states();
    let chosen = (0..n)
        .map(|x| policy.action(x, 0))
        .collect::<Result<Vec<_>, _>>()?;
    for (x, &action) in chosen.iter().enumerate() {
        if !model.is_available(x, action) {
            return Err(MdpError::IllegalAction { state: x, action });
        }
    }
    let restricted_actions: Vec<Vec<usize>> = chosen.iter().map(|&a| vec![a]).collect();

    let mut measure = Vec::with_capacity(n);
    for x in 0..n {
        let mut rewards = vec![vec![0.0; model.max_action()]; n];
        rewards[x][chosen[x]] = 1.0;

        let indicator = MdpModel::new(
            restricted_actions.clone(),
            model.transition_kernel().clone(),
            rewards,
        )?;
        let result = value_iteration(&indicator, INVARIANT_MAX_STEPS, INVARIANT_EPS)?;
        measure.push(result.gain);
    }
    Ok(measure)
}

/// 不變測度的經驗估計：代理從目前狀態開始執行策略 `steps` 步，回傳各狀態的造訪頻率
pub fn invariant_measure_estimate<E: Environment>(
    agent: &mut Agent<'_, E>,
    steps: usize,
) -> Result<Vec<f64>, MdpError> {
    invariant_measure_estimate_with_progress(agent, steps, &LoadingBar::hidden(steps as u64))
}

pub fn invariant_measure_estimate_with_progress<E: Environment>(
    agent: &mut Agent<'_, E>,
    steps: usize,
    progress: &LoadingBar,
) -> Result<Vec<f64>, MdpError> {
    if steps == 0 {
        return Err(MdpError::InvalidParameter {
            name: "steps",
            reason: "at least one simulation step is required".to_string(),
        });
    }

    let mut visits = vec![0usize; agent.env().states()];
    for i in 0..steps {
        agent.use_policy()?;
        visits[agent.env().state()] += 1;
        progress.update((i + 1) as u64);
    }

    Ok(visits
        .into_iter()
        .map(|count| count as f64 / steps as f64)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdp::process::Mdp;
    use crate::mdp::riverswim::{riverswim, RIGHT};

    #[test]
    fn test_rejects_non_positive_eps() {
        let model = riverswim(4, 0.35, 0.05, 0.1, 0.9).unwrap();
        assert_eq!(
            value_iteration(&model, 100, 0.0),
            Err(MdpError::InvalidEpsilon(0.0))
        );
        assert!(value_iteration(&model, 100, -1.0).is_err());
        assert!(value_iteration(&model, 100, f64::NAN).is_err());
    }

    #[test]
    fn test_not_converged_is_an_error() {
        let model = riverswim(10, 0.35, 0.05, 0.1, 0.9).unwrap();
        assert_eq!(
            value_iteration(&model, 3, 1e-6),
            Err(MdpError::NotConverged { max_steps: 3 })
        );
    }

    #[test]
    fn test_riverswim_optimal_policy_swims_right() {
        let model = riverswim(10, 0.35, 0.05, 0.1, 0.9).unwrap();
        let result = value_iteration(&model, 1_000_000, 1e-6).unwrap();

        assert_eq!(result.policy, Policy::stationary(vec![RIGHT; 10]));
        assert!((result.gain - 0.7714).abs() < 1e-3, "gain = {}", result.gain);
        assert_eq!(result.bias[0], 0.0);
        assert!(result.iterations > 1);
    }

    #[test]
    fn test_single_state_gain_is_best_reward() {
        let model = MdpModel::new(
            vec![vec![0, 1, 2]],
            vec![vec![vec![1.0], vec![1.0], vec![1.0]]],
            vec![vec![0.2, 0.7, 0.4]],
        )
        .unwrap();
        let result = value_iteration(&model, 10, 1e-9).unwrap();
        assert_eq!(result.policy.action(0, 0).unwrap(), 1);
        assert!((result.gain - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_invariant_measure_sums_to_one() {
        let model = riverswim(10, 0.35, 0.05, 0.1, 0.9).unwrap();
        let policy = Policy::stationary(vec![RIGHT; 10]);
        let measure = invariant_measure(&model, &policy).unwrap();

        assert_eq!(measure.len(), 10);
        let total: f64 = measure.iter().sum();
        assert!((total - 1.0).abs() < 1e-4, "total = {}", total);
        assert!((measure[9] - 0.857).abs() < 1e-3);
        assert!(measure.iter().all(|&m| m > -1e-6));
    }

    #[test]
    fn test_estimate_approaches_exact_measure() {
        let model = riverswim(10, 0.35, 0.05, 0.1, 0.9).unwrap();
        let policy = Policy::stationary(vec![RIGHT; 10]);
        let exact = invariant_measure(&model, &policy).unwrap();

        let mut mdp = Mdp::with_seed(model, 1.0, 2024).unwrap();
        let mut agent = Agent::with_seed(&mut mdp, &policy, 0);
        let estimate = invariant_measure_estimate(&mut agent, 200_000).unwrap();

        let total: f64 = estimate.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        for (e, x) in estimate.iter().zip(&exact) {
            assert!((e - x).abs() < 0.02, "estimate {} vs exact {}", e, x);
        }
    }

    #[test]
    fn test_invariant_measure_rejects_unavailable_action() {
        let model = riverswim(3, 0.35, 0.05, 0.1, 0.9).unwrap();
        assert_eq!(
            invariant_measure(&model, &Policy::stationary(vec![5, 1, 1])),
            Err(MdpError::IllegalAction {
                state: 0,
                action: 5
            })
        );
        assert!(matches!(
            invariant_measure(&model, &Policy::stationary(vec![1, 1])),
            Err(MdpError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_estimate_requires_steps() {
        let model = riverswim(3, 0.35, 0.05, 0.1, 0.9).unwrap();
        let policy = Policy::stationary(vec![RIGHT; 3]);
        let mut mdp = Mdp::with_seed(model, 1.0, 1).unwrap();
        let mut agent = Agent::with_seed(&mut mdp, &policy, 1);
        assert!(matches!(
            invariant_measure_estimate(&mut agent, 0),
            Err(MdpError::InvalidParameter { name: "steps", .. })
        ));
    }
}

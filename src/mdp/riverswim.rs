use crate::mdp::model::{Matrix, Matrix3D, MdpModel, DISTRIBUTION_TOLERANCE};
use crate::utils::error::MdpError;

pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;

/// RiverSwim：`n` 個狀態排成一列，向左必定成功，向右逆流前進。
///
/// 向右時有 `progress_chance` 前進一格、`flow_back_chance` 被沖回一格，其餘機率停在原地。
/// 最左端向左可得 `lazy_reward`，最右端向右可得 `win_reward`。
pub fn riverswim(
    n: usize,
    progress_chance: f64,
    flow_back_chance: f64,
    lazy_reward: f64,
    win_reward: f64,
) -> Result<MdpModel, MdpError> {
    if n < 2 {
        return Err(MdpError::InvalidParameter {
            name: "n",
            reason: format!("RiverSwim needs at least 2 states, got {}", n),
        });
    }

    // 0.9 + 0.1 之類的組合在浮點數下會得到 -2.8e-17，容許誤差後歸零
    let raw_halt_chance = 1.0 - progress_chance - flow_back_chance;
    if raw_halt_chance < -DISTRIBUTION_TOLERANCE {
        return Err(MdpError::InvalidParameter {
            name: "halt_chance",
            reason: format!(
                "progress_chance + flow_back_chance = {} exceeds 1",
                progress_chance + flow_back_chance
            ),
        });
    }
    let halt_chance = raw_halt_chance.max(0.0);
    for (name, value) in [
        ("progress_chance", progress_chance),
        ("flow_back_chance", flow_back_chance),
        ("halt_chance", halt_chance),
        ("lazy_reward", lazy_reward),
        ("win_reward", win_reward),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(MdpError::InvalidParameter {
                name,
                reason: format!("{} is not a chance in [0, 1]", value),
            });
        }
    }

    let actions: Matrix<usize> = vec![vec![LEFT, RIGHT]; n];
    let mut transitions: Matrix3D<f64> = vec![vec![vec![0.0; n]; 2]; n];

    for x in 1..n - 1 {
        transitions[x][RIGHT][x + 1] = progress_chance;
        transitions[x][RIGHT][x] = halt_chance;
        transitions[x][RIGHT][x - 1] = flow_back_chance;
        transitions[x][LEFT][x - 1] = 1.0;
    }
    transitions[0][RIGHT][0] = halt_chance;
    transitions[0][RIGHT][1] = progress_chance + flow_back_chance;
    transitions[0][LEFT][0] = 1.0;
    transitions[n - 1][RIGHT][n - 1] = progress_chance + halt_chance;
    transitions[n - 1][RIGHT][n - 2] = flow_back_chance;
    transitions[n - 1][LEFT][n - 2] = 1.0;

    let mut rewards: Matrix<f64> = vec![vec![0.0, 0.0]; n];
    rewards[0][LEFT] = lazy_reward;
    rewards[n - 1][RIGHT] = win_reward;

    MdpModel::new(actions, transitions, rewards)
}

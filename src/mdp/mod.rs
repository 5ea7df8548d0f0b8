// MDP 引擎：模型、模擬器、策略、代理與規劃演算法。

pub mod agent;
pub mod algorithms;
pub mod model;
pub mod policy;
pub mod process;
pub mod riverswim;

pub use agent::{Agent, Step};
pub use algorithms::{
    invariant_measure, invariant_measure_estimate, invariant_measure_estimate_with_progress,
    value_iteration, ValueIteration,
};
pub use model::{Matrix, Matrix3D, MdpModel};
pub use policy::Policy;
pub use process::{Environment, Mdp, OfflineMdp};
pub use riverswim::riverswim;

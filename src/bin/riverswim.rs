use clap::Parser;
use mdp_forge::mdp::riverswim::{LEFT, RIGHT};
use mdp_forge::mdp::{
    invariant_measure, invariant_measure_estimate_with_progress, riverswim, value_iteration,
    Agent, Mdp, OfflineMdp,
};
use mdp_forge::utils::error::{ForgeError, Result};
use mdp_forge::utils::progress::LoadingBar;
use mdp_forge::utils::validation::{validate_positive_number, validate_range, Validate};
use mdp_forge::utils::logger;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "riverswim")]
#[command(about = "Solve RiverSwim with value iteration and check the invariant measure")]
struct Args {
    /// Number of states in the river
    #[arg(short = 'n', long, default_value_t = 10)]
    states: usize,

    /// Chance of swimming upstream when going right
    #[arg(long, default_value_t = 0.35)]
    progress: f64,

    /// Chance of being washed back when going right
    #[arg(long, default_value_t = 0.05)]
    flow_back: f64,

    /// Reward for staying at the left bank
    #[arg(long, default_value_t = 0.1)]
    lazy: f64,

    /// Reward for reaching the right bank
    #[arg(long, default_value_t = 0.9)]
    win: f64,

    /// Simulation steps for the empirical invariant measure
    #[arg(short, long, default_value_t = 1_000_000)]
    steps: usize,

    /// Value iteration step limit
    #[arg(long, default_value_t = 1_000_000)]
    max_iterations: usize,

    /// Value iteration precision
    #[arg(long, default_value_t = 1e-6)]
    eps: f64,

    /// Seed for reproducible simulation
    #[arg(long)]
    seed: Option<u64>,

    /// Hide the loading bar
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Validate for Args {
    fn validate(&self) -> Result<()> {
        validate_positive_number("states", self.states, 2)?;
        validate_positive_number("steps", self.steps, 1)?;
        validate_positive_number("max_iterations", self.max_iterations, 1)?;
        validate_range("progress", self.progress, 0.0, 1.0)?;
        validate_range("flow_back", self.flow_back, 0.0, 1.0)?;
        validate_range("progress + flow_back", self.progress + self.flow_back, 0.0, 1.0)?;
        validate_range("lazy", self.lazy, 0.0, 1.0)?;
        validate_range("win", self.win, 0.0, 1.0)?;
        if !(self.eps > 0.0) {
            return Err(ForgeError::InvalidConfigValueError {
                field: "eps".to_string(),
                value: self.eps.to_string(),
                reason: "Precision must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn show_row(values: &[f64], width: usize) {
    let line: Vec<String> = values.iter().map(|v| format!("{:>width$.6}", v)).collect();
    println!("{}", line.join(" "));
}

fn show_transitions(mdp: &OfflineMdp, action: usize) -> Result<()> {
    let n = mdp.model().states();
    for x in 0..n {
        let row = (0..n)
            .map(|y| mdp.transition_chance(x, action, y))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        show_row(&row, 10);
    }
    println!();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    if let Err(e) = args.validate() {
        tracing::error!("❌ Invalid arguments: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let model = Arc::new(riverswim(
        args.states,
        args.progress,
        args.flow_back,
        args.lazy,
        args.win,
    )?);
    tracing::debug!("RiverSwim with {} states", model.states());

    let offline = OfflineMdp::new(Arc::clone(&model), 1.0)?;
    println!("Left:");
    show_transitions(&offline, LEFT)?;
    println!("Right:");
    show_transitions(&offline, RIGHT)?;

    // 值迭代求最佳策略
    let solution = value_iteration(&model, args.max_iterations, args.eps)?;
    tracing::info!(
        "✅ Value iteration converged after {} iterations (gain {:.6})",
        solution.iterations,
        solution.gain
    );
    print!("{}", solution.policy);
    println!();

    // 執行策略並估計不變測度
    let mut env = match args.seed {
        Some(seed) => Mdp::with_seed(Arc::clone(&model), 1.0, seed)?,
        None => Mdp::new(Arc::clone(&model), 1.0)?,
    };
    let mut agent = match args.seed {
        Some(seed) => Agent::with_seed(&mut env, &solution.policy, seed),
        None => Agent::new(&mut env, &solution.policy),
    };
    let bar = if args.no_progress {
        LoadingBar::hidden(args.steps as u64)
    } else {
        LoadingBar::new("Simulating", args.steps as u64)
    };
    let estimate = invariant_measure_estimate_with_progress(&mut agent, args.steps, &bar)?;
    println!(
        "Invariant measure after {} steps is estimated to be:",
        args.steps
    );
    show_row(&estimate, 12);
    println!();

    // 以值迭代求精確的不變測度
    let exact = invariant_measure(&model, &solution.policy)?;
    println!("Invariant measure with value iteration is supposed to be:");
    show_row(&exact, 12);
    println!();

    Ok(())
}

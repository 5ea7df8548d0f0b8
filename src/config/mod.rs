pub mod cli;
pub mod toml_config;

use crate::config::toml_config::{SetupConfig, DEFAULT_CONFIG_FILE};
use crate::core::engine::RunMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "mdp-forge")]
#[command(version, about = "Build and install the MDP native extension module")]
pub struct CliConfig {
    /// Path to the setup descriptor
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log CPU and memory usage after every stage
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Compile the extension module
    Build(BuildArgs),

    /// Compile the extension module and place it into the module path
    Install {
        #[command(flatten)]
        build: BuildArgs,

        /// Install directory (overrides [install].target_dir)
        #[arg(long)]
        prefix: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct BuildArgs {
    /// C++ compiler used for compiling and linking
    #[arg(long, env = "CXX")]
    pub compiler: Option<String>,

    /// Directory for object files and the built module
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Show what would be compiled without running the toolchain
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    pub fn mode(&self) -> RunMode {
        match self.command {
            Command::Build(_) => RunMode::Build,
            Command::Install { .. } => RunMode::Install,
        }
    }

    pub fn build_args(&self) -> &BuildArgs {
        match &self.command {
            Command::Build(args) => args,
            Command::Install { build, .. } => build,
        }
    }

    pub fn prefix(&self) -> Option<&PathBuf> {
        match &self.command {
            Command::Install { prefix, .. } => prefix.as_ref(),
            Command::Build(_) => None,
        }
    }

    /// 命令列設定覆蓋描述檔
    pub fn apply_overrides(&self, config: &mut SetupConfig) {
        let args = self.build_args();
        if let Some(compiler) = &args.compiler {
            tracing::info!("🔧 Compiler overridden to: {}", compiler);
            config.build.compiler = Some(compiler.clone());
        }
        if let Some(dir) = &args.build_dir {
            config.build.build_dir = Some(dir.to_string_lossy().into_owned());
        }
        if let Some(prefix) = self.prefix() {
            config.install.target_dir = Some(prefix.to_string_lossy().into_owned());
        }
        if self.monitor {
            config.monitoring = Some(toml_config::MonitoringConfig { enabled: true });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const MINIMAL: &str = r#"
[package]
name = "pymdp"
version = "0.1"

[extension]
name = "_pymdp"
sources = ["src/mdp.cpp"]

[build]
compiler = "g++"
"#;

    #[test]
    fn test_cli_definition() {
        CliConfig::command().debug_assert();
    }

    #[test]
    fn test_parse_build() {
        let cli = CliConfig::parse_from(["mdp-forge", "build", "--dry-run"]);
        assert_eq!(cli.mode(), RunMode::Build);
        assert!(cli.build_args().dry_run);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(cli.prefix().is_none());
    }

    #[test]
    fn test_parse_install_with_overrides() {
        let cli = CliConfig::parse_from([
            "mdp-forge",
            "--config",
            "pkg/setup.toml",
            "install",
            "--prefix",
            "/tmp/site",
            "--compiler",
            "clang++",
            "--build-dir",
            "out",
            "--monitor",
        ]);
        assert_eq!(cli.mode(), RunMode::Install);
        assert!(cli.monitor);

        let mut config = SetupConfig::from_toml_str(MINIMAL).unwrap();
        cli.apply_overrides(&mut config);
        assert_eq!(config.compiler(), "clang++");
        assert_eq!(config.build.build_dir.as_deref(), Some("out"));
        assert_eq!(config.target_dir(), Some("/tmp/site"));
        assert!(config.monitoring_enabled());
    }
}

use clap::Parser;
use mdp_forge::config::toml_config::SetupConfig;
use mdp_forge::core::engine::{Outcome, RunMode};
use mdp_forge::core::{ConfigProvider, Pipeline};
use mdp_forge::utils::validation::{validate_required_field, Validate};
use mdp_forge::utils::{error::ForgeError, logger};
use mdp_forge::{BuildEngine, CliConfig, CommandToolchain, ExtensionPipeline, LocalStorage};
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting mdp-forge");
    tracing::info!("📁 Loading descriptor from: {}", cli.config.display());
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    tracing::info!("✅ Descriptor loaded and validated successfully");
    display_config_summary(&config, &cli);

    let toolchain = CommandToolchain::new(config.compiler());

    if cli.build_args().dry_run {
        tracing::info!("🔍 DRY RUN MODE - the toolchain will not be invoked");
        if let Err(e) = perform_dry_run(&config, toolchain).await {
            fail(&e);
        }
        return;
    }

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let install_dir = match install_dir(&cli, &config) {
        Ok(dir) => dir,
        Err(e) => fail(&e),
    };

    // 創建安裝目的地與管線
    let storage = LocalStorage::new(install_dir);
    let pipeline = ExtensionPipeline::new(storage, toolchain, config);
    let engine = BuildEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run(cli.mode()).await {
        Ok(Outcome::Built(artifact)) => {
            tracing::info!("✅ Build completed successfully!");
            println!("✅ Build completed successfully!");
            println!("📦 Module: {}", artifact.path.display());
        }
        Ok(Outcome::Installed { report, .. }) => {
            tracing::info!("✅ Install completed successfully!");
            println!("✅ Install completed successfully!");
            for path in &report.installed {
                println!("📦 {}", path.display());
            }
            println!("📝 Record: {}", report.record_path.display());
        }
        Err(e) => fail(&e),
    }
}

/// 載入描述檔、套用命令列覆蓋並驗證
fn load_config(cli: &CliConfig) -> mdp_forge::Result<SetupConfig> {
    let base_dir = std::env::current_dir()?;
    let mut config = SetupConfig::from_file(&cli.config)?.with_base_dir(base_dir);
    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

fn install_dir(cli: &CliConfig, config: &SetupConfig) -> mdp_forge::Result<PathBuf> {
    match cli.mode() {
        RunMode::Install => {
            let dir = validate_required_field("install.target_dir", &config.install.target_dir)?;
            Ok(config.base_dir().join(dir))
        }
        // 只建置時不會寫入安裝目的地
        RunMode::Build => Ok(config
            .base_dir()
            .join(config.build_dir())
            .join("lib")),
    }
}

fn fail(e: &ForgeError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        e.stage(),
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    std::process::exit(e.exit_code());
}

fn display_config_summary(config: &SetupConfig, cli: &CliConfig) {
    println!("📋 Descriptor Summary:");
    println!(
        "  Package: {} v{}",
        config.package.name, config.package.version
    );
    if !config.package.author.is_empty() {
        println!("  Author: {}", config.package.author);
    }
    println!("  Extension: {}{}", config.module_name(), config.ext_suffix());
    println!("  Sources: {}", config.sources().join(", "));
    if !config.companion_modules().is_empty() {
        println!("  Modules: {}", config.companion_modules().join(", "));
    }
    println!("  Compiler: {}", config.compiler());
    println!("  Build dir: {}", config.build_dir());
    if let Some(dir) = config.target_dir() {
        println!("  Install dir: {}", dir);
    }

    if cli.build_args().dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: &SetupConfig, toolchain: CommandToolchain) -> mdp_forge::Result<()> {
    let pipeline = ExtensionPipeline::new(
        LocalStorage::new(config.base_dir()),
        toolchain,
        config.clone(),
    );
    let target = pipeline.configure().await?;
    let plan = pipeline.plan(&target);

    println!("🔍 Dry Run Analysis:");
    println!();
    println!("🔨 Compile ({} step(s)):", plan.compile.len());
    for job in &plan.compile {
        let args = CommandToolchain::compile_args(job);
        println!("  {}", pipeline.toolchain().command_line(&args));
    }
    println!();
    println!("🔗 Link:");
    let args = CommandToolchain::link_args(&plan.link);
    println!("  {}", pipeline.toolchain().command_line(&args));
    println!();
    println!("📦 Output: {}", plan.link.output.display());

    Ok(())
}

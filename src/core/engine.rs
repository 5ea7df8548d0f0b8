use crate::core::Pipeline;
use crate::domain::model::{CompiledArtifact, InstallReport};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// configure → build
    Build,
    /// configure → build → install
    Install,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Built(CompiledArtifact),
    Installed {
        artifact: CompiledArtifact,
        report: InstallReport,
    },
}

impl Outcome {
    pub fn artifact(&self) -> &CompiledArtifact {
        match self {
            Outcome::Built(artifact) => artifact,
            Outcome::Installed { artifact, .. } => artifact,
        }
    }
}

pub struct BuildEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> BuildEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// 依序執行各階段，前一階段成功才進入下一階段
    pub async fn run(&self, mode: RunMode) -> Result<Outcome> {
        tracing::info!("🚀 Starting {:?}...", mode);
        self.monitor.log_stats("Start");

        // Configure
        tracing::info!("⚙️ Configuring extension...");
        let target = self.pipeline.configure().await?;
        tracing::info!(
            "📋 {} v{}: {} source file(s)",
            target.metadata.name,
            target.metadata.version,
            target.sources.len()
        );
        self.monitor.log_stats("Configure");

        // Build
        tracing::info!("🔨 Building {}...", target.module_name);
        let artifact = self.pipeline.build(target).await?;
        tracing::info!(
            "✅ Built {} ({} bytes)",
            artifact.path.display(),
            artifact.size_bytes
        );
        self.monitor.log_stats("Build");

        let outcome = match mode {
            RunMode::Build => Outcome::Built(artifact),
            RunMode::Install => {
                // Install
                tracing::info!("📦 Installing {}...", artifact.module_name);
                let report = self.pipeline.install(artifact.clone()).await?;
                tracing::info!(
                    "✅ Installed {} file(s) into {}",
                    report.installed.len(),
                    report.target_dir.display()
                );
                self.monitor.log_stats("Install");
                Outcome::Installed { artifact, report }
            }
        };

        self.monitor.log_final_stats();
        Ok(outcome)
    }
}

use crate::core::{ConfigProvider, Pipeline, Storage, Toolchain};
use crate::domain::model::{
    BuildTarget, CompileJob, CompiledArtifact, InstallRecord, InstallReport, LinkJob,
};
use crate::utils::error::{BuildError, InstallError, Result};
use std::path::{Path, PathBuf};

pub const INSTALL_RECORD_FILE: &str = "install_record.json";

/// 一次建置要執行的全部工具鏈工作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub compile: Vec<CompileJob>,
    pub link: LinkJob,
}

/// configure → build → install，任何階段失敗即中止
pub struct ExtensionPipeline<S: Storage, T: Toolchain, C: ConfigProvider> {
    storage: S,
    toolchain: T,
    config: C,
}

/// 原始檔對應的目標檔名稱。以清單中的序號開頭，任兩個原始檔不會對應到同一個目標檔
fn object_file_name(index: usize, source: &Path) -> String {
    let flattened: String = source
        .to_string_lossy()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect();
    format!("{}_{}.o", index, flattened.trim_start_matches(&['.', '_'][..]))
}

impl<S: Storage, T: Toolchain, C: ConfigProvider> ExtensionPipeline<S, T, C> {
    pub fn new(storage: S, toolchain: T, config: C) -> Self {
        Self {
            storage,
            toolchain,
            config,
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    fn build_root(&self) -> PathBuf {
        self.config.base_dir().join(self.config.build_dir())
    }

    /// 依建置目標產生編譯與連結工作，不碰檔案系統
    pub fn plan(&self, target: &BuildTarget) -> BuildPlan {
        let base = self.config.base_dir();
        let temp_dir = self.build_root().join("temp");
        let output = self
            .build_root()
            .join("lib")
            .join(format!("{}{}", target.module_name, self.config.ext_suffix()));

        let compile: Vec<CompileJob> = target
            .sources
            .iter()
            .enumerate()
            .map(|(i, source)| CompileJob {
                source: base.join(source),
                object: temp_dir.join(object_file_name(i, source)),
                include_dirs: target
                    .options
                    .include_dirs
                    .iter()
                    .map(|dir| base.join(dir).to_string_lossy().into_owned())
                    .collect(),
                define_macros: target.options.define_macros.clone(),
                extra_args: target.options.extra_compile_args.clone(),
            })
            .collect();

        let link = LinkJob {
            objects: compile.iter().map(|job| job.object.clone()).collect(),
            output,
            extra_args: target.options.extra_link_args.clone(),
        };

        BuildPlan { compile, link }
    }

    async fn ensure_sources_exist(&self, target: &BuildTarget) -> Result<()> {
        for source in &target.sources {
            let path = self.config.base_dir().join(source);
            let is_file = tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !is_file {
                return Err(BuildError::MissingSource { path }.into());
            }
        }
        Ok(())
    }

    async fn remove_output(path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }

    async fn read_companion(&self, module: &str) -> Result<Vec<u8>> {
        let path = self
            .config
            .base_dir()
            .join(self.config.module_dir())
            .join(format!("{}.py", module));
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => InstallError::MissingCompanion { path }.into(),
            _ => InstallError::from_io(path, e).into(),
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage, T: Toolchain, C: ConfigProvider> Pipeline for ExtensionPipeline<S, T, C> {
    async fn configure(&self) -> Result<BuildTarget> {
        let metadata = self.config.metadata();
        tracing::debug!(
            "Configuring {} v{} ({} sources)",
            metadata.name,
            metadata.version,
            self.config.sources().len()
        );

        let target = BuildTarget::configure(
            self.config.module_name(),
            self.config.sources(),
            &metadata.version,
            &metadata.author,
            &metadata.description,
        )?
        .with_package_name(&metadata.name)
        .with_options(self.config.compile_options())
        .with_companion_modules(self.config.companion_modules().to_vec());

        Ok(target)
    }

    async fn build(&self, target: BuildTarget) -> Result<CompiledArtifact> {
        // 先確認所有原始檔都存在，缺檔時完全不呼叫編譯器
        self.ensure_sources_exist(&target).await?;

        let plan = self.plan(&target);
        let lib_dir = plan.link.output.parent();
        let temp_dir = plan.compile.first().and_then(|job| job.object.parent());
        for dir in [lib_dir, temp_dir].into_iter().flatten() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| BuildError::BuildDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        // 舊產物先移除，失敗的建置不留下可安裝的檔案
        Self::remove_output(&plan.link.output).await;

        for (i, job) in plan.compile.iter().enumerate() {
            tracing::info!(
                "🔨 [{}/{}] Compiling {}",
                i + 1,
                plan.compile.len(),
                job.source.display()
            );
            self.toolchain.compile(job).await?;
        }

        tracing::info!("🔗 Linking {}", plan.link.output.display());
        if let Err(e) = self.toolchain.link(&plan.link).await {
            Self::remove_output(&plan.link.output).await;
            return Err(e);
        }

        let size_bytes = match tokio::fs::metadata(&plan.link.output).await {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            _ => {
                return Err(BuildError::MissingOutput {
                    path: plan.link.output,
                }
                .into())
            }
        };

        Ok(CompiledArtifact {
            module_name: target.module_name,
            metadata: target.metadata,
            path: plan.link.output,
            sources: target.sources,
            companion_modules: target.companion_modules,
            size_bytes,
            built_at: chrono::Utc::now(),
        })
    }

    async fn install(&self, artifact: CompiledArtifact) -> Result<InstallReport> {
        let data = tokio::fs::read(&artifact.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => InstallError::MissingArtifact {
                path: artifact.path.clone(),
            },
            _ => InstallError::from_io(artifact.path.clone(), e),
        })?;

        // 伴隨模組先全部讀取，缺檔時不做任何寫入
        let mut companions = Vec::with_capacity(artifact.companion_modules.len());
        for module in &artifact.companion_modules {
            companions.push((format!("{}.py", module), self.read_companion(module).await?));
        }

        let file_name = artifact.file_name()?;
        self.storage.write_file(&file_name, &data).await?;
        let mut installed = vec![self.storage.location(&file_name)];
        tracing::info!("📦 Installed {}", self.storage.location(&file_name).display());

        for (name, contents) in &companions {
            self.storage.write_file(name, contents).await?;
            installed.push(self.storage.location(name));
            tracing::info!("📄 Installed {}", self.storage.location(name).display());
        }

        let record = InstallRecord {
            name: artifact.metadata.name.clone(),
            version: artifact.metadata.version.clone(),
            module_name: artifact.module_name.clone(),
            files: installed.clone(),
        };
        let record_json = serde_json::to_vec_pretty(&record)?;
        self.storage
            .write_file(INSTALL_RECORD_FILE, &record_json)
            .await?;

        Ok(InstallReport {
            target_dir: self.storage.location(""),
            installed,
            record_path: self.storage.location(INSTALL_RECORD_FILE),
        })
    }
}

use crate::domain::model::{
    BuildTarget, CompileJob, CompileOptions, CompiledArtifact, ExtensionMetadata, InstallReport,
    LinkJob,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// 安裝目的地（模組搜尋路徑）
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// `path` 安裝後的完整位置
    fn location(&self, path: &str) -> PathBuf;
}

pub trait ConfigProvider: Send + Sync {
    fn metadata(&self) -> ExtensionMetadata;
    fn module_name(&self) -> &str;
    fn sources(&self) -> &[String];
    fn compile_options(&self) -> CompileOptions;
    fn companion_modules(&self) -> &[String];
    /// 伴隨腳本模組所在目錄
    fn module_dir(&self) -> &str;
    /// 相對路徑的解析起點
    fn base_dir(&self) -> &Path;
    fn build_dir(&self) -> &str;
    fn ext_suffix(&self) -> String;
}

/// 原生編譯器/連結器。錯誤訊息原封不動回傳。
pub trait Toolchain: Send + Sync {
    fn program(&self) -> &str;
    fn compile(&self, job: &CompileJob) -> impl std::future::Future<Output = Result<()>> + Send;
    fn link(&self, job: &LinkJob) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn configure(&self) -> Result<BuildTarget>;
    async fn build(&self, target: BuildTarget) -> Result<CompiledArtifact>;
    async fn install(&self, artifact: CompiledArtifact) -> Result<InstallReport>;
}

use crate::domain::model::{CompileJob, LinkJob};
use crate::domain::ports::Toolchain;
use crate::utils::error::{BuildError, Result, ToolchainStage};
use tokio::process::Command;

/// 呼叫系統 C++ 編譯器（gcc/clang 相容介面）進行編譯與連結
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    program: String,
}

impl CommandToolchain {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// 編譯單一原始檔的參數
    pub fn compile_args(job: &CompileJob) -> Vec<String> {
        let mut args = vec!["-c".to_string(), "-fPIC".to_string()];
        args.extend(job.include_dirs.iter().map(|dir| format!("-I{}", dir)));
        args.extend(job.define_macros.iter().map(|def| format!("-D{}", def)));
        args.extend(job.extra_args.iter().cloned());
        args.push(job.source.to_string_lossy().into_owned());
        args.push("-o".to_string());
        args.push(job.object.to_string_lossy().into_owned());
        args
    }

    /// 連結成共享函式庫的參數
    pub fn link_args(job: &LinkJob) -> Vec<String> {
        let mut args = vec!["-shared".to_string()];
        if cfg!(target_os = "macos") {
            // 擴充模組的符號由宿主執行環境在載入時提供
            args.push("-undefined".to_string());
            args.push("dynamic_lookup".to_string());
        }
        args.extend(job.objects.iter().map(|obj| obj.to_string_lossy().into_owned()));
        args.push("-o".to_string());
        args.push(job.output.to_string_lossy().into_owned());
        args.extend(job.extra_args.iter().cloned());
        args
    }

    /// 用於 dry run 與日誌的完整指令
    pub fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn run(&self, stage: ToolchainStage, args: Vec<String>) -> Result<()> {
        tracing::debug!("$ {}", self.command_line(&args));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|source| BuildError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BuildError::Toolchain {
                stage,
                program: self.program.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
            .into());
        }

        if !output.stderr.is_empty() {
            // 警告不影響結果，但仍交給使用者
            tracing::warn!("{}", String::from_utf8_lossy(&output.stderr).trim_end());
        }
        Ok(())
    }
}

impl Toolchain for CommandToolchain {
    fn program(&self) -> &str {
        &self.program
    }

    async fn compile(&self, job: &CompileJob) -> Result<()> {
        self.run(ToolchainStage::Compile, Self::compile_args(job)).await
    }

    async fn link(&self, job: &LinkJob) -> Result<()> {
        self.run(ToolchainStage::Link, Self::link_args(job)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ForgeError;
    use std::path::PathBuf;

    fn compile_job() -> CompileJob {
        CompileJob {
            source: PathBuf::from("src/mdp.cpp"),
            object: PathBuf::from("build/temp/src_mdp.cpp.o"),
            include_dirs: vec!["src".to_string()],
            define_macros: vec!["NDEBUG".to_string(), "VERSION=1".to_string()],
            extra_args: vec!["-std=c++17".to_string()],
        }
    }

    #[test]
    fn test_compile_args() {
        let args = CommandToolchain::compile_args(&compile_job());
        assert_eq!(
            args,
            vec![
                "-c",
                "-fPIC",
                "-Isrc",
                "-DNDEBUG",
                "-DVERSION=1",
                "-std=c++17",
                "src/mdp.cpp",
                "-o",
                "build/temp/src_mdp.cpp.o",
            ]
        );
    }

    #[test]
    fn test_link_args_end_with_output_and_extra_args() {
        let job = LinkJob {
            objects: vec![PathBuf::from("a.o"), PathBuf::from("b.o")],
            output: PathBuf::from("build/lib/_pymdp.so"),
            extra_args: vec!["-lm".to_string()],
        };
        let args = CommandToolchain::link_args(&job);
        assert_eq!(args[0], "-shared");
        assert!(args.contains(&"a.o".to_string()));
        assert_eq!(&args[args.len() - 3..], &["-o", "build/lib/_pymdp.so", "-lm"]);
    }

    #[test]
    fn test_command_line() {
        let toolchain = CommandToolchain::new("g++");
        assert_eq!(
            toolchain.command_line(&["-c".to_string(), "a.cpp".to_string()]),
            "g++ -c a.cpp"
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let toolchain = CommandToolchain::new("mdp-forge-no-such-compiler");
        let err = toolchain.compile(&compile_job()).await.unwrap_err();
        assert!(matches!(err, ForgeError::Build(BuildError::Spawn { .. })));
    }
}

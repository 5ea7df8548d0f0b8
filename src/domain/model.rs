use crate::utils::error::{ForgeError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_identifier, validate_non_empty_string, validate_path,
    SOURCE_EXTENSIONS,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionMetadata {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
}

/// 傳給編譯器與連結器的額外選項
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    pub include_dirs: Vec<String>,
    /// `NAME` 或 `NAME=VALUE`
    pub define_macros: Vec<String>,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
}

/// 產生單一產物所需的完整輸入
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildTarget {
    pub module_name: String,
    pub sources: Vec<PathBuf>,
    pub metadata: ExtensionMetadata,
    pub options: CompileOptions,
    /// 與原生模組一同安裝的純腳本模組名稱
    pub companion_modules: Vec<String>,
}

impl BuildTarget {
    /// 驗證輸入並建立建置目標，不產生任何副作用
    pub fn configure(
        module_name: &str,
        sources: &[String],
        version: &str,
        author: &str,
        description: &str,
    ) -> Result<Self> {
        validate_identifier("extension.name", module_name)?;
        validate_non_empty_string("package.version", version)?;

        if sources.is_empty() {
            return Err(ForgeError::ConfigValidationError {
                field: "extension.sources".to_string(),
                message: "at least one source file is required".to_string(),
            });
        }
        for (i, source) in sources.iter().enumerate() {
            validate_path("extension.sources", source)?;
            if sources[..i].contains(source) {
                return Err(ForgeError::InvalidConfigValueError {
                    field: "extension.sources".to_string(),
                    value: source.clone(),
                    reason: "Source is listed more than once".to_string(),
                });
            }
        }
        validate_file_extensions("extension.sources", sources, SOURCE_EXTENSIONS)?;

        Ok(Self {
            module_name: module_name.to_string(),
            sources: sources.iter().map(PathBuf::from).collect(),
            metadata: ExtensionMetadata {
                name: module_name.to_string(),
                version: version.to_string(),
                author: author.to_string(),
                description: description.to_string(),
            },
            options: CompileOptions::default(),
            companion_modules: Vec::new(),
        })
    }

    pub fn with_package_name(mut self, name: &str) -> Self {
        self.metadata.name = name.to_string();
        self
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_companion_modules(mut self, modules: Vec<String>) -> Self {
        self.companion_modules = modules;
        self
    }
}

/// 單一原始檔的編譯工作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    pub source: PathBuf,
    pub object: PathBuf,
    pub include_dirs: Vec<String>,
    pub define_macros: Vec<String>,
    pub extra_args: Vec<String>,
}

/// 將所有目標檔連結成可載入模組
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkJob {
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,
    pub extra_args: Vec<String>,
}

/// 建置階段的產物：一個可載入的原生模組
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledArtifact {
    pub module_name: String,
    pub metadata: ExtensionMetadata,
    pub path: PathBuf,
    pub sources: Vec<PathBuf>,
    pub companion_modules: Vec<String>,
    pub size_bytes: u64,
    pub built_at: DateTime<Utc>,
}

impl CompiledArtifact {
    pub fn file_name(&self) -> Result<String> {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| ForgeError::config(format!("artifact path {:?} has no file name", self.path)))
    }
}

/// `install_record.json` 的內容。不含時間戳記，重複安裝結果相同。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallRecord {
    pub name: String,
    pub version: String,
    pub module_name: String,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstallReport {
    pub target_dir: PathBuf,
    pub installed: Vec<PathBuf>,
    pub record_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_configure_builds_target() {
        let target = BuildTarget::configure(
            "_pymdp",
            &sources(&["swig/pymdp_wrap.cxx", "src/mdp.cpp"]),
            "0.1",
            "Apolline Rodary",
            "Markov decision processes",
        )
        .unwrap();

        assert_eq!(target.module_name, "_pymdp");
        assert_eq!(target.sources.len(), 2);
        assert_eq!(target.sources[1], PathBuf::from("src/mdp.cpp"));
        assert_eq!(target.metadata.version, "0.1");
        assert!(target.companion_modules.is_empty());
    }

    #[test]
    fn test_configure_rejects_empty_sources() {
        let err = BuildTarget::configure("_pymdp", &[], "0.1", "", "").unwrap_err();
        assert!(matches!(err, ForgeError::ConfigValidationError { ref field, .. } if field == "extension.sources"));
    }

    #[test]
    fn test_configure_rejects_malformed_entries() {
        for bad in [vec![""], vec!["src/mdp.cpp", "  "], vec!["src/\0.cpp"], vec!["README.md"]] {
            let result = BuildTarget::configure("_pymdp", &sources(&bad), "0.1", "", "");
            assert!(result.is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_configure_rejects_duplicate_sources() {
        let err = BuildTarget::configure(
            "_pymdp",
            &sources(&["src/mdp.cpp", "a.cpp", "src/mdp.cpp"]),
            "0.1",
            "",
            "",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ForgeError::InvalidConfigValueError { ref value, .. } if value == "src/mdp.cpp"
        ));
    }

    #[test]
    fn test_configure_rejects_bad_module_name_and_version() {
        let srcs = sources(&["a.cpp"]);
        assert!(BuildTarget::configure("my-module", &srcs, "0.1", "", "").is_err());
        assert!(BuildTarget::configure("mod", &srcs, " ", "", "").is_err());
    }

    #[test]
    fn test_artifact_file_name() {
        let artifact = CompiledArtifact {
            module_name: "_pymdp".to_string(),
            metadata: ExtensionMetadata {
                name: "pymdp".to_string(),
                version: "0.1".to_string(),
                author: String::new(),
                description: String::new(),
            },
            path: PathBuf::from("build/lib/_pymdp.so"),
            sources: vec![],
            companion_modules: vec![],
            size_bytes: 0,
            built_at: Utc::now(),
        };
        assert_eq!(artifact.file_name().unwrap(), "_pymdp.so");
    }
}

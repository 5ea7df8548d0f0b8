use crate::domain::model::{CompileOptions, ExtensionMetadata};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ForgeError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_identifier, validate_non_empty_string, validate_path,
    Validate, SOURCE_EXTENSIONS,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_CONFIG_FILE: &str = "setup.toml";
pub const DEFAULT_BUILD_DIR: &str = "build";
pub const DEFAULT_COMPILER: &str = "c++";

/// 擴充模組的建置描述檔 (`setup.toml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    pub package: PackageConfig,
    pub extension: ExtensionConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub install: InstallConfig,
    pub monitoring: Option<MonitoringConfig>,
    /// 相對路徑的解析起點，預設為目前工作目錄
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    /// 與原生模組一起安裝的純腳本模組 (不含副檔名)
    #[serde(default)]
    pub py_modules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub define_macros: Vec<String>,
    #[serde(default)]
    pub extra_compile_args: Vec<String>,
    #[serde(default)]
    pub extra_link_args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    pub compiler: Option<String>,
    pub build_dir: Option<String>,
    pub ext_suffix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallConfig {
    pub target_dir: Option<String>,
    pub module_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

/// 平台預設的擴充模組副檔名
pub fn default_ext_suffix() -> &'static str {
    if cfg!(windows) {
        ".pyd"
    } else {
        ".so"
    }
}

impl SetupConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| ForgeError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ForgeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CXX})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("package.name", &self.package.name)?;
        validate_non_empty_string("package.version", &self.package.version)?;
        validate_identifier("extension.name", &self.extension.name)?;

        for source in &self.extension.sources {
            validate_path("extension.sources", source)?;
        }
        validate_file_extensions("extension.sources", &self.extension.sources, SOURCE_EXTENSIONS)?;

        for module in &self.package.py_modules {
            validate_identifier("package.py_modules", module)?;
        }

        if let Some(compiler) = &self.build.compiler {
            validate_non_empty_string("build.compiler", compiler)?;
            if compiler.contains("${") {
                return Err(ForgeError::InvalidConfigValueError {
                    field: "build.compiler".to_string(),
                    value: compiler.clone(),
                    reason: "environment variable is not set".to_string(),
                });
            }
        }
        if let Some(dir) = &self.build.build_dir {
            validate_path("build.build_dir", dir)?;
        }
        if let Some(suffix) = &self.build.ext_suffix {
            if !suffix.starts_with('.') || suffix.len() < 2 {
                return Err(ForgeError::InvalidConfigValueError {
                    field: "build.ext_suffix".to_string(),
                    value: suffix.clone(),
                    reason: "Suffix must start with '.'".to_string(),
                });
            }
        }
        if let Some(dir) = &self.install.target_dir {
            validate_path("install.target_dir", dir)?;
        }

        Ok(())
    }

    pub fn compiler(&self) -> &str {
        self.build.compiler.as_deref().unwrap_or(DEFAULT_COMPILER)
    }

    pub fn target_dir(&self) -> Option<&str> {
        self.install.target_dir.as_deref()
    }

    /// 是否啟用監控
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for SetupConfig {
    fn metadata(&self) -> ExtensionMetadata {
        ExtensionMetadata {
            name: self.package.name.clone(),
            version: self.package.version.clone(),
            author: self.package.author.clone(),
            description: self.package.description.clone(),
        }
    }

    fn module_name(&self) -> &str {
        &self.extension.name
    }

    fn sources(&self) -> &[String] {
        &self.extension.sources
    }

    fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            include_dirs: self.extension.include_dirs.clone(),
            define_macros: self.extension.define_macros.clone(),
            extra_compile_args: self.extension.extra_compile_args.clone(),
            extra_link_args: self.extension.extra_link_args.clone(),
        }
    }

    fn companion_modules(&self) -> &[String] {
        &self.package.py_modules
    }

    fn module_dir(&self) -> &str {
        self.install.module_dir.as_deref().unwrap_or(".")
    }

    fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn build_dir(&self) -> &str {
        self.build.build_dir.as_deref().unwrap_or(DEFAULT_BUILD_DIR)
    }

    fn ext_suffix(&self) -> String {
        self.build
            .ext_suffix
            .clone()
            .unwrap_or_else(|| default_ext_suffix().to_string())
    }
}

impl Validate for SetupConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PYMDP_SETUP: &str = r#"
[package]
name = "pymdp"
version = "0.1"
author = "Apolline Rodary"
description = "Markov decision processes"
py_modules = ["pymdp"]

[extension]
name = "_pymdp"
sources = ["swig/pymdp_wrap.cxx", "src/mdp.cpp"]

[install]
module_dir = "swig"
"#;

    #[test]
    fn test_parse_setup_config() {
        let config = SetupConfig::from_toml_str(PYMDP_SETUP).unwrap();

        assert_eq!(config.package.name, "pymdp");
        assert_eq!(config.module_name(), "_pymdp");
        assert_eq!(config.sources().len(), 2);
        assert_eq!(config.companion_modules(), &["pymdp".to_string()]);
        assert_eq!(config.module_dir(), "swig");
        assert_eq!(config.build_dir(), DEFAULT_BUILD_DIR);
        assert_eq!(config.compiler(), DEFAULT_COMPILER);
        assert_eq!(config.ext_suffix(), default_ext_suffix());
        assert!(config.target_dir().is_none());
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("MDP_FORGE_TEST_CXX", "clang++");

        let toml_content = r#"
[package]
name = "pymdp"
version = "0.1"

[extension]
name = "_pymdp"
sources = ["src/mdp.cpp"]

[build]
compiler = "${MDP_FORGE_TEST_CXX}"
"#;

        let config = SetupConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.compiler(), "clang++");

        std::env::remove_var("MDP_FORGE_TEST_CXX");
    }

    #[test]
    fn test_unset_env_var_fails_validation() {
        let toml_content = r#"
[package]
name = "pymdp"
version = "0.1"

[extension]
name = "_pymdp"
sources = ["src/mdp.cpp"]

[build]
compiler = "${MDP_FORGE_DEFINITELY_UNSET}"
"#;

        let config = SetupConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ForgeError::InvalidConfigValueError { ref field, .. }) if field == "build.compiler"
        ));
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[package]
name = "pymdp"
version = "0.1"

[extension]
name = "_pymdp"
sources = ["src/mdp.hpp"]
"#;

        let config = SetupConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_sources_parse_but_are_caught_at_configure() {
        let toml_content = r#"
[package]
name = "pymdp"
version = "0.1"

[extension]
name = "_pymdp"
"#;

        let config = SetupConfig::from_toml_str(toml_content).unwrap();
        assert!(config.sources().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml() {
        let err = SetupConfig::from_toml_str("[package\nname=").unwrap_err();
        assert!(matches!(err, ForgeError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(PYMDP_SETUP.as_bytes()).unwrap();

        let config = SetupConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.package.version, "0.1");
        assert_eq!(config.base_dir, PathBuf::new());

        assert!(SetupConfig::from_file("/nonexistent/setup.toml").is_err());
    }
}

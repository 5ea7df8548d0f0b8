use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Build failed: {0}")]
    Build(#[from] BuildError),

    #[error("Install failed: {0}")]
    Install(#[from] InstallError),

    #[error("MDP error: {0}")]
    Mdp(#[from] MdpError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 工具鏈 (編譯器/連結器) 執行階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainStage {
    Compile,
    Link,
}

impl std::fmt::Display for ToolchainStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolchainStage::Compile => write!(f, "compile"),
            ToolchainStage::Link => write!(f, "link"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("source file not found: {}", .path.display())]
    MissingSource { path: PathBuf },

    /// stderr 原封不動保留，不做任何解讀
    #[error("{stage} step failed ({program}, exit status {}):\n{stderr}", .status.map(|s| s.to_string()).unwrap_or_else(|| "signal".to_string()))]
    Toolchain {
        stage: ToolchainStage,
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create build directory {}: {source}", .path.display())]
    BuildDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("toolchain reported success but produced no output at {}", .path.display())]
    MissingOutput { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("destination {} exists and is a directory", .path.display())]
    PathConflict { path: PathBuf },

    #[error("permission denied writing {}", .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("companion module not found: {}", .path.display())]
    MissingCompanion { path: PathBuf },

    #[error("compiled artifact not found: {}", .path.display())]
    MissingArtifact { path: PathBuf },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InstallError {
    /// 將 I/O 錯誤依種類對應到安裝錯誤
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => InstallError::PermissionDenied { path },
            _ => InstallError::Write { path, source },
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum MdpError {
    #[error("shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("transition row p(.|{state}, {action}) sums to {sum}, expected 1")]
    InvalidDistribution { state: usize, action: usize, sum: f64 },

    #[error("{what} at ({state}, {action}) is {value}, expected a chance in [0, 1]")]
    InvalidChance {
        what: &'static str,
        state: usize,
        action: usize,
        value: f64,
    },

    #[error("state {state} has no available action")]
    NoAvailableActions { state: usize },

    #[error("action {action} is not available from state {state}")]
    IllegalAction { state: usize, action: usize },

    #[error("index out of range: {0}")]
    OutOfRange(String),

    #[error("eps must be a positive value, got {0}")]
    InvalidEpsilon(f64),

    #[error("value iteration did not converge within {max_steps} steps")]
    NotConverged { max_steps: usize },

    #[error("policy is empty")]
    EmptyPolicy,

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Build,
    Install,
    Model,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ForgeError {
    pub fn config(message: impl Into<String>) -> Self {
        ForgeError::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ForgeError::ConfigError { .. }
            | ForgeError::ConfigValidationError { .. }
            | ForgeError::InvalidConfigValueError { .. }
            | ForgeError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ForgeError::Build(_) => ErrorCategory::Build,
            ForgeError::Install(_) => ErrorCategory::Install,
            ForgeError::Mdp(_) => ErrorCategory::Model,
            ForgeError::IoError(_) | ForgeError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Model => ErrorSeverity::Medium,
            ErrorCategory::Build => ErrorSeverity::High,
            ErrorCategory::Install | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 發生錯誤的管線階段
    pub fn stage(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "configure",
            ErrorCategory::Build => "build",
            ErrorCategory::Install => "install",
            ErrorCategory::Model => "model",
            ErrorCategory::System => "system",
        }
    }

    /// 依嚴重程度決定行程結束碼，任何失敗皆不為 0
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low | ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ForgeError::ConfigError { .. } | ForgeError::ConfigValidationError { .. } => {
                "Check that setup.toml exists and is valid TOML".to_string()
            }
            ForgeError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in setup.toml", field)
            }
            ForgeError::MissingConfigError { field } => {
                format!("Add '{}' to setup.toml", field)
            }
            ForgeError::Build(BuildError::MissingSource { .. }) => {
                "Make sure every listed source exists relative to the working directory"
                    .to_string()
            }
            ForgeError::Build(BuildError::Spawn { program, .. }) => format!(
                "Install a C++ compiler or point [build].compiler / --compiler at one (tried '{}')",
                program
            ),
            ForgeError::Build(BuildError::BuildDir { .. }) => {
                "Make sure the build directory is writable or choose another --build-dir".to_string()
            }
            ForgeError::Build(_) => "Fix the compiler or linker errors reported above".to_string(),
            ForgeError::Install(InstallError::PathConflict { .. }) => {
                "Remove the conflicting directory or choose another --prefix".to_string()
            }
            ForgeError::Install(InstallError::PermissionDenied { .. }) => {
                "Choose a writable --prefix or re-run with sufficient permissions".to_string()
            }
            ForgeError::Install(_) => "Check the install directory and companion modules".to_string(),
            ForgeError::Mdp(_) => "Check the MDP tables and algorithm parameters".to_string(),
            ForgeError::IoError(_) | ForgeError::SerializationError(_) => {
                "Check disk space and file permissions".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        format!("[{}] {}", self.stage(), self)
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_share_category() {
        let errors = [
            ForgeError::config("bad"),
            ForgeError::MissingConfigError {
                field: "extension.sources".to_string(),
            },
            ForgeError::InvalidConfigValueError {
                field: "extension.name".to_string(),
                value: "1abc".to_string(),
                reason: "not an identifier".to_string(),
            },
        ];
        for e in errors {
            assert_eq!(e.category(), ErrorCategory::Configuration);
            assert_eq!(e.stage(), "configure");
            assert_ne!(e.exit_code(), 0);
        }
    }

    #[test]
    fn test_toolchain_stderr_is_kept_verbatim() {
        let stderr = "a.cpp:3:1: error: expected ';' before '}' token";
        let err: ForgeError = BuildError::Toolchain {
            stage: ToolchainStage::Compile,
            program: "c++".to_string(),
            status: Some(1),
            stderr: stderr.to_string(),
        }
        .into();

        assert_eq!(err.category(), ErrorCategory::Build);
        assert!(err.to_string().contains(stderr));
        assert!(err.user_friendly_message().starts_with("[build]"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_install_error_from_permission_denied() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = InstallError::from_io(PathBuf::from("/usr/lib/_pymdp.so"), io);
        assert!(matches!(err, InstallError::PermissionDenied { .. }));

        let err: ForgeError = err.into();
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_mdp_error_display() {
        let err = MdpError::IllegalAction {
            state: 3,
            action: 7,
        };
        assert_eq!(err.to_string(), "action 7 is not available from state 3");
        assert_eq!(
            MdpError::InvalidEpsilon(0.0).to_string(),
            "eps must be a positive value, got 0"
        );
    }
}

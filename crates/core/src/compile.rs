//! Compiler configuration and invocation.
//!
//! The compiler is opaque: toolhome only assembles its configuration (the
//! materialized toolchain home, entry point, target and classpath) and hands
//! it to a [`Compiler`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::coordinate::ArtifactCoordinate;
use crate::materialize::{ArtifactMaterializer, MaterializeOptions};
use crate::{Error, Result};

/// Target operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    /// macOS desktop.
    #[serde(alias = "macos", alias = "darwin")]
    MacOsX,
    /// iOS devices and simulator.
    Ios,
    /// Linux.
    Linux,
}

impl TargetOs {
    /// Parse from string, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "macosx" | "macos" | "darwin" => Some(Self::MacOsX),
            "ios" => Some(Self::Ios),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }
}

impl std::fmt::Display for TargetOs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MacOsX => write!(f, "macosx"),
            Self::Ios => write!(f, "ios"),
            Self::Linux => write!(f, "linux"),
        }
    }
}

impl std::str::FromStr for TargetOs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            Error::configuration(format!("Unknown OS '{s}' (expected macosx, ios or linux)"))
        })
    }
}

/// Target CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetArch {
    /// 32-bit x86, used by the iOS simulator.
    #[serde(alias = "i386")]
    X86,
    /// 64-bit x86.
    #[serde(rename = "x86_64", alias = "amd64", alias = "x64")]
    X86_64,
    /// 32-bit ARM (Thumb-2).
    #[serde(alias = "armv7")]
    Thumbv7,
    /// 64-bit ARM.
    #[serde(alias = "aarch64")]
    Arm64,
}

impl TargetArch {
    /// Parse from string, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "x86" | "i386" => Some(Self::X86),
            "x86_64" | "amd64" | "x64" => Some(Self::X86_64),
            "thumbv7" | "armv7" => Some(Self::Thumbv7),
            "arm64" | "aarch64" => Some(Self::Arm64),
            _ => None,
        }
    }
}

impl std::fmt::Display for TargetArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X86 => write!(f, "x86"),
            Self::X86_64 => write!(f, "x86_64"),
            Self::Thumbv7 => write!(f, "thumbv7"),
            Self::Arm64 => write!(f, "arm64"),
        }
    }
}

impl std::str::FromStr for TargetArch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            Error::configuration(format!(
                "Unknown architecture '{s}' (expected x86, x86_64, thumbv7 or arm64)"
            ))
        })
    }
}

/// Everything the compiler needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerConfig {
    /// Materialized toolchain directory.
    pub home: PathBuf,
    /// Entry point class.
    pub main_class: String,
    /// Target OS; the compiler's default when unset.
    pub os: Option<TargetOs>,
    /// Target architecture; the compiler's default when unset.
    pub arch: Option<TargetArch>,
    /// Runtime classpath in order.
    pub classpath: Vec<PathBuf>,
}

impl CompilerConfig {
    /// Start building a configuration.
    #[must_use]
    pub fn builder() -> CompilerConfigBuilder {
        CompilerConfigBuilder::default()
    }
}

/// Builder for [`CompilerConfig`].
#[derive(Debug, Clone, Default)]
pub struct CompilerConfigBuilder {
    home: Option<PathBuf>,
    main_class: Option<String>,
    os: Option<TargetOs>,
    arch: Option<TargetArch>,
    classpath: Vec<PathBuf>,
}

impl CompilerConfigBuilder {
    /// Set the toolchain home.
    #[must_use]
    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Set the entry point class.
    #[must_use]
    pub fn main_class(mut self, main_class: impl Into<String>) -> Self {
        self.main_class = Some(main_class.into());
        self
    }

    /// Set the target OS.
    #[must_use]
    pub const fn os(mut self, os: Option<TargetOs>) -> Self {
        self.os = os;
        self
    }

    /// Set the target architecture.
    #[must_use]
    pub const fn arch(mut self, arch: Option<TargetArch>) -> Self {
        self.arch = arch;
        self
    }

    /// Append one classpath entry.
    #[must_use]
    pub fn classpath_entry(mut self, entry: impl Into<PathBuf>) -> Self {
        let entry = entry.into();
        debug!(?entry, "Including classpath element");
        self.classpath.push(entry);
        self
    }

    /// Append several classpath entries.
    #[must_use]
    pub fn classpath<I, P>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        entries
            .into_iter()
            .fold(self, |builder, entry| builder.classpath_entry(entry))
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the home or main class is missing,
    /// or the main class is blank or contains whitespace.
    pub fn build(self) -> Result<CompilerConfig> {
        let home = self
            .home
            .ok_or_else(|| Error::configuration("toolchain home is not set"))?;
        let main_class = self
            .main_class
            .ok_or_else(|| Error::configuration("main class is not set (build.main-class)"))?;
        if main_class.trim().is_empty() || main_class.contains(char::is_whitespace) {
            return Err(Error::configuration(format!(
                "main class '{main_class}' is not a valid class name"
            )));
        }
        Ok(CompilerConfig {
            home,
            main_class,
            os: self.os,
            arch: self.arch,
            classpath: self.classpath,
        })
    }
}

/// Runs a compilation.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compiler name for logs.
    fn name(&self) -> &'static str;

    /// Compile with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compile`] if the compiler cannot be started or fails.
    async fn compile(&self, config: &CompilerConfig) -> Result<()>;
}

/// Launcher used when none is configured, relative to the toolchain home.
pub const DEFAULT_LAUNCHER: &str = "bin/toolhome-compiler";

/// Runs the compiler shipped inside the toolchain as a child process.
///
/// Invocation: `<launcher> -home <home> [-os <os>] [-arch <arch>] [-cp <cp>] <main-class>`.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    launcher: PathBuf,
}

impl Default for ProcessCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_LAUNCHER)
    }
}

impl ProcessCompiler {
    /// Create a compiler running `launcher` (relative to home unless absolute).
    #[must_use]
    pub fn new(launcher: impl Into<PathBuf>) -> Self {
        Self {
            launcher: launcher.into(),
        }
    }

    /// Executable to run for `config`.
    #[must_use]
    pub fn program(&self, config: &CompilerConfig) -> PathBuf {
        if self.launcher.is_absolute() {
            self.launcher.clone()
        } else {
            config.home.join(&self.launcher)
        }
    }

    /// Command-line arguments for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a classpath entry contains the
    /// platform path separator.
    pub fn args(config: &CompilerConfig) -> Result<Vec<OsString>> {
        let mut args: Vec<OsString> = vec!["-home".into(), config.home.clone().into()];
        if let Some(os) = config.os {
            args.extend(["-os".into(), os.to_string().into()]);
        }
        if let Some(arch) = config.arch {
            args.extend(["-arch".into(), arch.to_string().into()]);
        }
        if !config.classpath.is_empty() {
            let joined = std::env::join_paths(&config.classpath)
                .map_err(|e| Error::configuration(format!("Invalid classpath entry: {e}")))?;
            args.extend(["-cp".into(), joined]);
        }
        args.push(config.main_class.clone().into());
        Ok(args)
    }
}

#[async_trait]
impl Compiler for ProcessCompiler {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn compile(&self, config: &CompilerConfig) -> Result<()> {
        let program = self.program(config);
        if !program.is_file() {
            return Err(Error::Compile {
                message: format!("compiler launcher not found at {}", program.display()),
                stderr: None,
            });
        }
        let args = Self::args(config)?;
        info!(
            program = ?program,
            main_class = %config.main_class,
            classpath_entries = config.classpath.len(),
            "Running compiler"
        );

        let output = Command::new(&program)
            .args(&args)
            .current_dir(&config.home)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::Compile {
                message: format!("failed to run {}: {e}", program.display()),
                stderr: None,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::Compile {
                message: format!("{} exited with {}", program.display(), output.status),
                stderr: (!stderr.is_empty()).then_some(stderr),
            });
        }

        debug!(program = ?program, "Compiler finished");
        Ok(())
    }
}

/// Materialize the toolchain for `coordinate` and compile with it.
///
/// `config` carries everything except the home, which is set to the
/// materialized directory.
///
/// # Errors
///
/// Propagates materialization, configuration and compiler errors unchanged.
pub async fn materialize_and_compile(
    materializer: &ArtifactMaterializer,
    coordinate: &ArtifactCoordinate,
    options: &MaterializeOptions,
    config: CompilerConfigBuilder,
    compiler: &dyn Compiler,
) -> Result<CompilerConfig> {
    let materialization = materializer.materialize(coordinate, options).await?;
    let config = config.home(materialization.path).build()?;
    info!(%coordinate, compiler = compiler.name(), home = ?config.home, "Building application");
    compiler.compile(&config).await?;
    Ok(config)
}

/// Resolve classpath entries against `base` and check that they exist.
///
/// # Errors
///
/// Returns [`Error::Configuration`] naming the first missing entry.
pub fn resolve_classpath(base: &Path, entries: &[PathBuf]) -> Result<Vec<PathBuf>> {
    entries
        .iter()
        .map(|entry| {
            let path = if entry.is_absolute() {
                entry.clone()
            } else {
                base.join(entry)
            };
            if path.exists() {
                Ok(path)
            } else {
                Err(Error::configuration(format!(
                    "classpath entry {} does not exist",
                    path.display()
                )))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> CompilerConfig {
        CompilerConfig::builder()
            .home("/opt/dist")
            .main_class("com.example.Main")
            .os(Some(TargetOs::Ios))
            .arch(Some(TargetArch::X86))
            .classpath(["/a/classes", "/b/lib.jar"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_os_parse() {
        assert_eq!(TargetOs::parse("iOS"), Some(TargetOs::Ios));
        assert_eq!(TargetOs::parse("darwin"), Some(TargetOs::MacOsX));
        assert_eq!(TargetOs::parse("MACOSX"), Some(TargetOs::MacOsX));
        assert_eq!(TargetOs::parse("windows"), None);
        assert!("plan9".parse::<TargetOs>().is_err());
    }

    #[test]
    fn test_arch_parse() {
        assert_eq!(TargetArch::parse("i386"), Some(TargetArch::X86));
        assert_eq!(TargetArch::parse("AMD64"), Some(TargetArch::X86_64));
        assert_eq!(TargetArch::parse("armv7"), Some(TargetArch::Thumbv7));
        assert_eq!(TargetArch::parse("aarch64"), Some(TargetArch::Arm64));
        assert_eq!(TargetArch::parse("mips"), None);
    }

    #[test]
    fn test_display_matches_parse() {
        for os in [TargetOs::MacOsX, TargetOs::Ios, TargetOs::Linux] {
            assert_eq!(TargetOs::parse(&os.to_string()), Some(os));
        }
        for arch in [
            TargetArch::X86,
            TargetArch::X86_64,
            TargetArch::Thumbv7,
            TargetArch::Arm64,
        ] {
            assert_eq!(TargetArch::parse(&arch.to_string()), Some(arch));
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&TargetOs::MacOsX).unwrap(), "\"macosx\"");
        assert_eq!(serde_json::to_string(&TargetArch::X86_64).unwrap(), "\"x86_64\"");
        let arch: TargetArch = serde_json::from_str("\"aarch64\"").unwrap();
        assert_eq!(arch, TargetArch::Arm64);
    }

    #[test]
    fn test_builder_requires_main_class() {
        let err = CompilerConfig::builder().home("/opt").build().unwrap_err();
        assert!(err.to_string().contains("main class is not set"));
    }

    #[test]
    fn test_builder_requires_home() {
        let err = CompilerConfig::builder()
            .main_class("a.B")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("home"));
    }

    #[test]
    fn test_builder_rejects_blank_main_class() {
        for bad in ["", "  ", "com.example Main"] {
            let result = CompilerConfig::builder().home("/h").main_class(bad).build();
            assert!(result.is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_builder_keeps_classpath_order() {
        let config = config();
        assert_eq!(
            config.classpath,
            vec![PathBuf::from("/a/classes"), PathBuf::from("/b/lib.jar")]
        );
    }

    #[test]
    fn test_process_args() {
        let args = ProcessCompiler::args(&config()).unwrap();
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let sep = if cfg!(windows) { ";" } else { ":" };
        assert_eq!(
            args,
            vec![
                "-home".to_string(),
                "/opt/dist".to_string(),
                "-os".to_string(),
                "ios".to_string(),
                "-arch".to_string(),
                "x86".to_string(),
                "-cp".to_string(),
                format!("/a/classes{sep}/b/lib.jar"),
                "com.example.Main".to_string(),
            ]
        );
    }

    #[test]
    fn test_process_args_minimal() {
        let config = CompilerConfig::builder()
            .home("/h")
            .main_class("a.B")
            .build()
            .unwrap();
        let args = ProcessCompiler::args(&config).unwrap();
        assert_eq!(args, vec![OsString::from("-home"), "/h".into(), "a.B".into()]);
    }

    #[test]
    fn test_program_relative_and_absolute() {
        let relative = ProcessCompiler::default();
        assert_eq!(
            relative.program(&config()),
            PathBuf::from("/opt/dist/bin/toolhome-compiler")
        );
        let absolute = ProcessCompiler::new("/usr/local/bin/cc-app");
        assert_eq!(absolute.program(&config()), PathBuf::from("/usr/local/bin/cc-app"));
    }

    #[tokio::test]
    async fn test_missing_launcher() {
        let temp = TempDir::new().unwrap();
        let config = CompilerConfig::builder()
            .home(temp.path())
            .main_class("a.B")
            .build()
            .unwrap();
        let err = ProcessCompiler::default().compile(&config).await.unwrap_err();
        assert!(err.to_string().contains("launcher not found"));
    }

    #[cfg(unix)]
    fn write_script(home: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        let bin = home.join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let script = bin.join("toolhome-compiler");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_compiler_passes_arguments() {
        let temp = TempDir::new().unwrap();
        write_script(temp.path(), r#"echo "$@" > "$(dirname "$0")/../args.txt""#);
        let config = CompilerConfig::builder()
            .home(temp.path())
            .main_class("com.example.Main")
            .os(Some(TargetOs::Linux))
            .build()
            .unwrap();

        ProcessCompiler::default().compile(&config).await.unwrap();

        let recorded = std::fs::read_to_string(temp.path().join("args.txt")).unwrap();
        assert_eq!(
            recorded.trim(),
            format!("-home {} -os linux com.example.Main", temp.path().display())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_compiler_failure_captures_stderr() {
        let temp = TempDir::new().unwrap();
        write_script(temp.path(), "echo 'missing class' >&2\nexit 3");
        let config = CompilerConfig::builder()
            .home(temp.path())
            .main_class("a.B")
            .build()
            .unwrap();

        let err = ProcessCompiler::default().compile(&config).await.unwrap_err();
        match err {
            Error::Compile { stderr, .. } => assert_eq!(stderr.as_deref(), Some("missing class")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_classpath() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("classes")).unwrap();

        let resolved = resolve_classpath(temp.path(), &[PathBuf::from("classes")]).unwrap();
        assert_eq!(resolved, vec![temp.path().join("classes")]);

        let err = resolve_classpath(temp.path(), &[PathBuf::from("missing.jar")]).unwrap_err();
        assert!(err.to_string().contains("missing.jar"));
    }
}

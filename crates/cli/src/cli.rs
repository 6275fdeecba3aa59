use crate::tracing::{LogLevel, TracingFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use toolhome_core::{ArtifactCoordinate, Settings, TargetArch, TargetOs};

#[derive(Parser, Debug)]
#[command(name = "toolhome")]
#[command(about = "Materialize versioned toolchain bundles and build applications with them")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub format: TracingFormat,

    #[arg(long, global = true, help = "Output logs and results as JSON")]
    pub json: bool,

    #[arg(
        short = 'c',
        long,
        global = true,
        env = "TOOLHOME_CONFIG",
        help = "Settings file (defaults to ./toolhome.toml when present)"
    )]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Log format after applying `--json`.
    pub const fn tracing_format(&self) -> TracingFormat {
        if self.json {
            TracingFormat::Json
        } else {
            self.format
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Resolve the toolchain bundle and unpack it once")]
    Materialize(MaterializeArgs),
    #[command(about = "Materialize the toolchain and compile the application with it")]
    Build(BuildArgs),
    #[command(about = "Print the effective settings as TOML")]
    Config(ConfigArgs),
}

/// Which bundle to materialize and where.
#[derive(Args, Debug, Clone, Default)]
pub struct DistArgs {
    #[arg(long, help = "Bundle coordinate as group:name:packaging:version")]
    pub coordinate: Option<ArtifactCoordinate>,

    #[arg(long, help = "Bundle version, overriding the configured one")]
    pub dist_version: Option<String>,

    #[arg(long, help = "Base directory to unpack into")]
    pub dist_dir: Option<PathBuf>,

    #[arg(long, help = "Only use the local repository")]
    pub offline: bool,

    #[arg(long, help = "Local repository root")]
    pub local_repository: Option<PathBuf>,
}

impl DistArgs {
    /// Layer these flags over `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(coordinate) = &self.coordinate {
            settings.dist.set_coordinate(coordinate);
        }
        if let Some(version) = &self.dist_version {
            settings.dist.version = Some(version.clone());
        }
        if let Some(dir) = &self.dist_dir {
            settings.dist.dir = Some(dir.clone());
        }
        if self.offline {
            settings.resolver.offline = true;
        }
        if let Some(local) = &self.local_repository {
            settings.resolver.local_repository = Some(local.clone());
        }
    }
}

/// What to compile and for which target.
#[derive(Args, Debug, Clone, Default)]
pub struct CompilerArgs {
    #[arg(long, help = "Class whose main method starts the application")]
    pub main_class: Option<String>,

    #[arg(long, help = "Target OS (macosx, ios, linux)")]
    pub os: Option<TargetOs>,

    #[arg(long, help = "Target architecture (x86, x86_64, thumbv7, arm64)")]
    pub arch: Option<TargetArch>,

    #[arg(
        long = "cp",
        value_name = "PATH",
        help = "Classpath entry, repeatable; replaces the configured classpath"
    )]
    pub classpath: Vec<PathBuf>,

    #[arg(long, help = "Compiler launcher, relative to the toolchain home unless absolute")]
    pub launcher: Option<PathBuf>,
}

impl CompilerArgs {
    /// Layer these flags over `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(main_class) = &self.main_class {
            settings.build.main_class = Some(main_class.clone());
        }
        if self.os.is_some() {
            settings.build.os = self.os;
        }
        if self.arch.is_some() {
            settings.build.arch = self.arch;
        }
        if !self.classpath.is_empty() {
            settings.build.classpath.clone_from(&self.classpath);
        }
        if let Some(launcher) = &self.launcher {
            settings.build.launcher = Some(launcher.clone());
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct MaterializeArgs {
    #[command(flatten)]
    pub dist: DistArgs,

    #[arg(long, help = "Re-extract even if already materialized")]
    pub force: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub dist: DistArgs,

    #[command(flatten)]
    pub compiler: CompilerArgs,

    #[arg(long, help = "Re-extract even if already materialized")]
    pub force: bool,
}

impl BuildArgs {
    /// Layer these flags over `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        self.dist.apply(settings);
        self.compiler.apply(settings);
    }
}

/// Everything that ends up in the settings file; nothing that only affects a run.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub dist: DistArgs,

    #[command(flatten)]
    pub compiler: CompilerArgs,
}

impl ConfigArgs {
    /// Layer these flags over `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        self.dist.apply(settings);
        self.compiler.apply(settings);
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["toolhome", "materialize"]).unwrap();

        assert_eq!(cli.level, LogLevel::Warn);
        assert_eq!(cli.format, TracingFormat::Compact);
        assert!(!cli.json);
        assert!(cli.config.is_none());
        let Commands::Materialize(args) = cli.command else {
            panic!("Expected Materialize command");
        };
        assert!(args.dist.coordinate.is_none());
        assert!(!args.force);
    }

    #[test]
    fn test_cli_log_level_parsing() {
        let cli = Cli::try_parse_from(["toolhome", "--level", "debug", "config"]).unwrap();
        assert_eq!(cli.level, LogLevel::Debug);

        let cli = Cli::try_parse_from(["toolhome", "-l", "error", "config"]).unwrap();
        assert_eq!(cli.level, LogLevel::Error);

        assert!(Cli::try_parse_from(["toolhome", "--level", "loud", "config"]).is_err());
    }

    #[test]
    fn test_json_flag_selects_json_logs() {
        let cli = Cli::try_parse_from(["toolhome", "materialize", "--json"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.tracing_format(), TracingFormat::Json);

        let cli = Cli::try_parse_from(["toolhome", "--format", "pretty", "config"]).unwrap();
        assert_eq!(cli.tracing_format(), TracingFormat::Pretty);
    }

    #[test]
    fn test_materialize_flags() {
        let cli = Cli::try_parse_from([
            "toolhome",
            "materialize",
            "--coordinate",
            "org.example:dist:tar.gz:1.2.3",
            "--dist-version",
            "1.3.0",
            "--dist-dir",
            "/opt/toolchains",
            "--force",
            "--offline",
            "--local-repository",
            "/var/m2",
        ])
        .unwrap();

        let Commands::Materialize(args) = cli.command else {
            panic!("Expected Materialize command");
        };
        let mut settings = Settings::default();
        args.dist.apply(&mut settings);

        assert!(args.force);
        assert_eq!(
            settings.dist.coordinate().unwrap().to_string(),
            "org.example:dist:tar.gz:1.3.0"
        );
        assert_eq!(settings.dist.dir, Some(PathBuf::from("/opt/toolchains")));
        assert!(settings.resolver.offline);
        assert_eq!(
            settings.resolver.local_repository,
            Some(PathBuf::from("/var/m2"))
        );
    }

    #[test]
    fn test_invalid_coordinate_rejected() {
        let result = Cli::try_parse_from(["toolhome", "materialize", "--coordinate", "a:b:c"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_build_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "toolhome",
            "build",
            "--main-class",
            "com.example.Main",
            "--os",
            "ios",
            "--arch",
            "armv7",
            "--cp",
            "target/classes",
            "--cp",
            "lib/a.jar",
        ])
        .unwrap();

        let Commands::Build(args) = cli.command else {
            panic!("Expected Build command");
        };
        let mut settings = Settings::default();
        settings.build.classpath = vec![PathBuf::from("old.jar")];
        args.apply(&mut settings);

        assert_eq!(settings.build.main_class.as_deref(), Some("com.example.Main"));
        assert_eq!(settings.build.os, Some(TargetOs::Ios));
        assert_eq!(settings.build.arch, Some(TargetArch::Thumbv7));
        assert_eq!(
            settings.build.classpath,
            vec![PathBuf::from("target/classes"), PathBuf::from("lib/a.jar")]
        );
    }

    #[test]
    fn test_unset_flags_keep_settings() {
        let mut settings = Settings::default();
        settings.build.os = Some(TargetOs::Linux);
        settings.dist.version = Some("2.0".to_string());

        BuildArgs::default().apply(&mut settings);

        assert_eq!(settings.build.os, Some(TargetOs::Linux));
        assert_eq!(settings.dist.version.as_deref(), Some("2.0"));
        assert!(!settings.resolver.offline);
    }

    #[test]
    fn test_config_rejects_force() {
        let err = Cli::try_parse_from(["toolhome", "config", "--force"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);

        let cli = Cli::try_parse_from(["toolhome", "config", "--offline", "--os", "ios"]).unwrap();
        let Commands::Config(args) = cli.command else {
            panic!("Expected Config command");
        };
        let mut settings = Settings::default();
        args.apply(&mut settings);
        assert!(settings.resolver.offline);
        assert_eq!(settings.build.os, Some(TargetOs::Ios));
    }

    #[test]
    fn test_build_accepts_force() {
        let cli = Cli::try_parse_from(["toolhome", "build", "--force"]).unwrap();
        let Commands::Build(args) = cli.command else {
            panic!("Expected Build command");
        };
        assert!(args.force);
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(Cli::try_parse_from(["toolhome"]).is_err());
    }

    #[test]
    fn test_help_flag() {
        let err = Cli::try_parse_from(["toolhome", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}

//! Core of toolhome: idempotent materialization of versioned toolchains.
//!
//! This crate provides:
//! - Artifact coordinates and remote repository descriptors
//! - The resolver and unarchiver collaborator traits
//! - The materializer, which unpacks each version at most once per target
//! - Compiler configuration and the build operation built on top of it
//! - Settings loaded from `toolhome.toml`
//!
//! Concrete resolvers and unarchivers live in `toolhome-maven` and
//! `toolhome-archive`.
//!
//! # Example
//!
//! ```ignore
//! let materializer = ArtifactMaterializer::new(resolver, unarchivers)
//!     .with_repositories(vec![RemoteRepository::central()]);
//! let coordinate = ArtifactCoordinate::parse("org.example:dist:tar.gz:1.2.3")?;
//! let done = materializer.materialize(&coordinate, &MaterializeOptions::new()).await?;
//! println!("toolchain home: {}", done.path.display());
//! ```

#![warn(missing_docs)]

pub mod compile;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod extract;
pub mod lock;
pub mod materialize;
pub mod resolve;

pub use compile::{
    Compiler, CompilerConfig, CompilerConfigBuilder, ProcessCompiler, TargetArch, TargetOs,
    materialize_and_compile,
};
pub use config::Settings;
pub use coordinate::{ArtifactCoordinate, RemoteRepository};
pub use error::{Error, Result};
pub use extract::{Unarchiver, UnarchiverRegistry};
pub use materialize::{
    ArtifactMaterializer, COMPLETION_MARKER, CompletionMarker, Materialization,
    MaterializationTarget, MaterializeOptions, SubdirNaming,
};
pub use resolve::{ArtifactResolver, LOCAL_PROVENANCE, ResolvedArtifact};

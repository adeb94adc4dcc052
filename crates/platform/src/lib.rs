#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Platform abstraction layer for wdm
//!
//! This crate provides a unified interface for the macOS facilities wdm
//! depends on:
//! - Process execution with event emission and error handling
//! - Installer archive tooling (`xar`, `pkgutil`, `productbuild`, `open`)
//! - System queries (`sysctl`)
//! - Filesystem helpers for staging trees
//!
//! Every external invocation reports through the `wdm-events` channel held by
//! [`PlatformContext`], so callers never print directly.

pub mod archive;
pub mod core;
pub mod fs;
pub mod implementations;
pub mod process;
pub mod system;

pub use self::core::{Platform, PlatformContext};
pub use implementations::macos::MacOSPlatform;

/// Re-export commonly used types
pub use archive::{ArchiveOperation, ArchiveOperations, ToolOutcome};
pub use process::{CommandOutput, PlatformCommand, ProcessOperations};
pub use system::SystemOperations;

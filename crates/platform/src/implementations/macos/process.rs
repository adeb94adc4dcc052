//! macOS process operations implementation
//!
//! Runs commands through `tokio::process`, emitting started/completed/failed
//! platform events around every invocation.

use async_trait::async_trait;
use std::convert::TryFrom;
use std::time::{Duration, Instant};
use tokio::process::Command;
use wdm_errors::{Error, PlatformError};
use wdm_events::{
    AppEvent, EventEmitter, FailureContext, PlatformEvent, PlatformOperationContext,
    PlatformOperationKind, PlatformOperationMetrics, ProcessCommandDescriptor,
};

use crate::core::PlatformContext;
use crate::process::{CommandOutput, PlatformCommand, ProcessOperations};

/// macOS implementation of process operations
#[derive(Debug, Default)]
pub struct MacOSProcessOperations;

impl MacOSProcessOperations {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn process_context(descriptor: ProcessCommandDescriptor) -> PlatformOperationContext {
    PlatformOperationContext {
        kind: PlatformOperationKind::Process,
        operation: "execute_command".to_string(),
        target: None,
        command: Some(descriptor),
    }
}

fn process_metrics(duration: Duration, output: Option<&CommandOutput>) -> PlatformOperationMetrics {
    PlatformOperationMetrics {
        duration_ms: Some(duration_to_millis(duration)),
        exit_code: output.and_then(|o| o.status.code()),
        stdout_bytes: output.and_then(|o| u64::try_from(o.stdout.len()).ok()),
        stderr_bytes: output.and_then(|o| u64::try_from(o.stderr.len()).ok()),
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl ProcessOperations for MacOSProcessOperations {
    async fn execute_command(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, Error> {
        let start = Instant::now();
        let descriptor = ProcessCommandDescriptor {
            program: cmd.program().to_string(),
            args: cmd.get_args().to_vec(),
            cwd: cmd.get_current_dir().cloned(),
        };

        ctx.emit(AppEvent::Platform(PlatformEvent::OperationStarted {
            context: process_context(descriptor.clone()),
        }));

        let result: Result<CommandOutput, PlatformError> = async {
            let mut command = Command::new(cmd.program());
            command.args(cmd.get_args());

            if let Some(dir) = cmd.get_current_dir() {
                command.current_dir(dir);
            }

            for (key, value) in cmd.get_env_vars() {
                command.env(key, value);
            }

            let output = command.output().await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PlatformError::CommandNotFound {
                        command: cmd.program().to_string(),
                    }
                } else {
                    PlatformError::ProcessExecutionFailed {
                        command: cmd.program().to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

            Ok(CommandOutput {
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
        .await;

        let duration = start.elapsed();

        match &result {
            Ok(output) => {
                ctx.emit(AppEvent::Platform(PlatformEvent::OperationCompleted {
                    context: process_context(descriptor),
                    metrics: Some(process_metrics(duration, Some(output))),
                }));
            }
            Err(e) => {
                ctx.emit(AppEvent::Platform(PlatformEvent::OperationFailed {
                    context: process_context(descriptor),
                    failure: FailureContext::from_error(e),
                    metrics: Some(process_metrics(duration, None)),
                }));
            }
        }

        result.map_err(Error::from)
    }
}

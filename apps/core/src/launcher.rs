use std::process::{Command, Stdio};

use tracing::{debug, warn};

/// Platform launch primitive. `true` means an entry point existed and was invoked.
pub trait Launcher: Send + Sync {
    fn attempt_launch(&self, id: &str) -> bool;
}

impl<F> Launcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn attempt_launch(&self, id: &str) -> bool {
        self(id)
    }
}

/// Runs an argv template with `{id}` substituted, e.g. `["gtk-launch", "{id}"]`.
pub struct CommandLauncher {
    template: Vec<String>,
}

impl CommandLauncher {
    pub fn new(template: Vec<String>) -> Self {
        Self { template }
    }

    pub fn command_for(&self, id: &str) -> Option<Vec<String>> {
        let trimmed = id.trim();
        if trimmed.is_empty() || self.template.is_empty() {
            return None;
        }
        Some(
            self.template
                .iter()
                .map(|part| part.replace("{id}", trimmed))
                .collect(),
        )
    }
}

impl Launcher for CommandLauncher {
    fn attempt_launch(&self, id: &str) -> bool {
        let Some(argv) = self.command_for(id) else {
            return false;
        };
        let Some((program, args)) = argv.split_first() else {
            return false;
        };
        // Launch helpers like gtk-launch exit once the app is started, so the exit
        // status says whether an entry point was actually invoked.
        match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => {
                debug!(id, "launched");
                true
            }
            Ok(status) => {
                warn!(id, program = %program, %status, "launch command reported failure");
                false
            }
            Err(error) => {
                warn!(id, program = %program, %error, "launch command failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandLauncher, Launcher};

    #[test]
    fn substitutes_id_into_template() {
        let launcher = CommandLauncher::new(vec!["gtk-launch".into(), "{id}".into()]);
        assert_eq!(
            launcher.command_for(" firefox "),
            Some(vec!["gtk-launch".to_string(), "firefox".to_string()])
        );
    }

    #[test]
    fn empty_template_or_id_has_no_command() {
        assert_eq!(CommandLauncher::new(Vec::new()).command_for("firefox"), None);
        assert_eq!(CommandLauncher::new(vec!["open".into()]).command_for("  "), None);
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_not_a_launch() {
        let failing = CommandLauncher::new(vec!["sh".into(), "-c".into(), "exit 1".into(), "{id}".into()]);
        assert!(!failing.attempt_launch("org.example.camera"));

        let succeeding = CommandLauncher::new(vec!["sh".into(), "-c".into(), "exit 0".into(), "{id}".into()]);
        assert!(succeeding.attempt_launch("org.example.camera"));
    }

    #[test]
    fn missing_program_is_not_a_launch() {
        let launcher = CommandLauncher::new(vec!["appshelf-no-such-launcher".into(), "{id}".into()]);
        assert!(!launcher.attempt_launch("org.example.camera"));
    }
}

//! Resolution of a server script path into the command that launches it.
//!
//! ```rust
//! use tsession::{Interpreters, ServerCommand, SessionErrorKind};
//!
//! let command = ServerCommand::for_script("weather.py", &Interpreters::default())
//!     .expect("python scripts are supported");
//! assert_eq!(command.program(), "python");
//!
//! let error = ServerCommand::for_script("notes.txt", &Interpreters::default())
//!     .expect_err("text files are not servers");
//! assert_eq!(error.kind, SessionErrorKind::UnsupportedScript);
//! ```

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::SessionError;

/// Interpreter executables used for each supported script kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreters {
    pub python: String,
    pub node: String,
}

impl Default for Interpreters {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            node: "node".to_string(),
        }
    }
}

impl Interpreters {
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = node.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    program: String,
    args: Vec<String>,
    script: Option<PathBuf>,
}

impl ServerCommand {
    /// Launches an arbitrary program; no script checks apply.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            script: None,
        }
    }

    /// Picks the interpreter from the script's extension: `.py` or `.js`, nothing else.
    pub fn for_script(script: impl AsRef<Path>, interpreters: &Interpreters) -> Result<Self, SessionError> {
        let script = script.as_ref();
        let program = match script.extension().and_then(|ext| ext.to_str()) {
            Some("py") => interpreters.python.clone(),
            Some("js") => interpreters.node.clone(),
            _ => {
                return Err(SessionError::unsupported_script(format!(
                    "server script must be a .py or .js file, got '{}'",
                    script.display()
                )));
            }
        };

        Ok(Self {
            program,
            args: vec![script.to_string_lossy().into_owned()],
            script: Some(script.to_path_buf()),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn script(&self) -> Option<&Path> {
        self.script.as_deref()
    }

    pub(crate) fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

impl Display for ServerCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionErrorKind;

    #[test]
    fn python_and_node_scripts_pick_their_interpreter() {
        let interpreters = Interpreters::default().with_python("python3");

        let python = ServerCommand::for_script("servers/weather.py", &interpreters)
            .expect("py should resolve");
        assert_eq!(python.program(), "python3");
        assert_eq!(python.args(), ["servers/weather.py".to_string()]);
        assert_eq!(python.script(), Some(Path::new("servers/weather.py")));

        let node = ServerCommand::for_script("build/index.js", &interpreters)
            .expect("js should resolve");
        assert_eq!(node.program(), "node");
        assert_eq!(node.to_string(), "node build/index.js");
    }

    #[test]
    fn other_extensions_are_rejected() {
        for script in ["server.txt", "server", "server.PY", "server.ts", "py"] {
            let error = ServerCommand::for_script(script, &Interpreters::default())
                .expect_err("unsupported extension should fail");
            assert_eq!(error.kind, SessionErrorKind::UnsupportedScript, "{script}");
        }
    }

    #[test]
    fn explicit_commands_carry_no_script() {
        let command = ServerCommand::new("sh", vec!["-c".to_string(), "exit 0".to_string()]);
        assert_eq!(command.script(), None);
        assert_eq!(command.to_string(), "sh -c exit 0");
    }
}

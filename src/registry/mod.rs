use anyhow::{anyhow, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Agent names must be lowercase identifiers. Anything else is rejected
/// before it can reach process invocation.
const NAME_PATTERN: &str = "^[a-z][a-z0-9_-]*$";

/// Validated command descriptor for one registered agent: the program to
/// run plus its fixed leading arguments. The dispatch payload is always
/// appended as the final positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl AgentCommand {
    /// Descriptor for a discovered script. Python scripts run under the
    /// interpreter; everything else is invoked directly.
    pub fn for_script(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") => Self {
                program: PathBuf::from("python3"),
                args: vec![path.display().to_string()],
            },
            _ => Self {
                program: path.to_path_buf(),
                args: Vec::new(),
            },
        }
    }

    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Allow-list mapping agent names to command descriptors. Only names that
/// pass validation and were discovered (or explicitly registered) can ever
/// be invoked.
#[derive(Debug)]
pub struct AgentRegistry {
    agents: HashMap<String, AgentCommand>,
    name_pattern: Regex,
}

impl AgentRegistry {
    pub fn empty() -> Result<Self> {
        Ok(Self {
            agents: HashMap::new(),
            name_pattern: Regex::new(NAME_PATTERN)?,
        })
    }

    /// Build the registry by scanning one directory level for entries whose
    /// file stem ends with `suffix`. The agent name is the stem with the
    /// suffix stripped: `security_agent.py` registers `security`, an
    /// executable `echo_agent` registers `echo`. Entries with invalid or
    /// empty names are skipped with a warning.
    pub fn discover(dir: &Path, suffix: &str) -> Result<Self> {
        let mut registry = Self::empty()?;

        let entries = std::fs::read_dir(dir)
            .map_err(|e| anyhow!("failed to read agents directory {}: {}", dir.display(), e))?;

        for entry in entries {
            let entry = entry
                .map_err(|e| anyhow!("failed to read agents directory {}: {}", dir.display(), e))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem,
                None => continue,
            };

            let name = match stem.strip_suffix(suffix) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => continue,
            };

            if !registry.name_pattern.is_match(&name) {
                log::warn!(
                    "skipping agent script {} (invalid agent name {:?})",
                    path.display(),
                    name
                );
                continue;
            }

            registry.agents.insert(name, AgentCommand::for_script(&path));
        }

        Ok(registry)
    }

    /// Register an agent explicitly. Fails on names the pattern rejects.
    pub fn register(&mut self, name: &str, command: AgentCommand) -> Result<()> {
        if !self.name_pattern.is_match(name) {
            return Err(anyhow!("invalid agent name: {:?}", name));
        }
        self.agents.insert(name.to_string(), command);
        Ok(())
    }

    pub fn is_valid_name(&self, name: &str) -> bool {
        self.name_pattern.is_match(name)
    }

    pub fn resolve(&self, name: &str) -> Option<&AgentCommand> {
        self.agents.get(name)
    }

    /// Sorted allow-list of registered agent names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

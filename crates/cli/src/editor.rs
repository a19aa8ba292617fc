use anyhow::{bail, Result};
use findcode_protocol::ResolvedLocation;
use log::{debug, warn};

/// External command that opens a resolved location, built from a template such
/// as `code --goto {path}:{line}:{column}`.
///
/// Placeholders are filled with 1-based editor coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    parts: Vec<String>,
}

impl EditorCommand {
    pub fn parse(template: &str) -> Result<Self> {
        let parts: Vec<String> = template.split_whitespace().map(str::to_string).collect();
        if parts.is_empty() {
            bail!("Editor command template is empty");
        }
        if !parts.iter().any(|part| part.contains("{path}")) {
            bail!("Editor command template must contain {{path}}: {template}");
        }
        Ok(Self { parts })
    }

    /// Fill the template. An unknown position leaves the cursor alone: the
    /// coordinates after `{path}` are cut and parts that only carry
    /// coordinates are dropped.
    pub fn render(&self, location: &ResolvedLocation) -> Vec<String> {
        let path = location.file_path.display().to_string();
        if location.position_unknown {
            return self
                .parts
                .iter()
                .filter_map(|part| match part.find("{path}") {
                    Some(at) => Some(part[..at + "{path}".len()].replace("{path}", &path)),
                    None if part.contains("{line}") || part.contains("{column}") => None,
                    None => Some(part.clone()),
                })
                .collect();
        }

        let line = location.line.saturating_add(1).to_string();
        let column = location.column.saturating_add(1).to_string();
        self.parts
            .iter()
            .map(|part| {
                part.replace("{path}", &path)
                    .replace("{line}", &line)
                    .replace("{column}", &column)
            })
            .collect()
    }

    /// Start the editor and reap it in the background. Failures are logged.
    pub fn launch(&self, location: &ResolvedLocation) {
        let argv = self.render(location);
        let Some((program, args)) = argv.split_first() else {
            return;
        };
        match tokio::process::Command::new(program).args(args).spawn() {
            Ok(mut child) => {
                debug!("Launched editor: {}", argv.join(" "));
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) if !status.success() => warn!("Editor exited with {status}"),
                        Ok(_) => {}
                        Err(err) => warn!("Failed to wait for editor: {err}"),
                    }
                });
            }
            Err(err) => warn!("Failed to launch editor {program}: {err}"),
        }
    }
}

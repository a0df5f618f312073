//! Composition tool argument injection and output rewriting

/// Hints in the tool's output that refer to wiring this layer owns
const OWNED_HINTS: [&str; 5] = [
    "--file",
    "--project-name",
    "--project-directory",
    "default: docker-compose.yml",
    "default: directory name",
];

const TOOL_NAMES: [&str; 2] = ["docker-compose", "docker compose"];

/// Line filter applied to the composition tool's stdout
#[derive(Debug, Clone)]
pub struct OutputFilter {
    verb: String,
}

impl OutputFilter {
    pub fn new(verb: impl Into<String>) -> Self {
        Self { verb: verb.into() }
    }

    /// Drop lines mentioning owned flags and rebrand the tool name
    ///
    /// Returns `None` when the line should not be printed.
    pub fn apply(&self, line: &str) -> Option<String> {
        if OWNED_HINTS.iter().any(|hint| line.contains(hint)) {
            return None;
        }
        let mut out = line.to_string();
        for name in TOOL_NAMES {
            out = out.replace(name, &self.verb);
        }
        Some(out)
    }
}

/// Insert `--no-start` before the first `--` separator, or append it
pub fn inject_no_start(args: &[String]) -> Vec<String> {
    let mut out = args.to_vec();
    let at = out.iter().position(|a| a == "--").unwrap_or(out.len());
    out.insert(at, "--no-start".to_string());
    out
}

/// Insert `--detach` right after `up` unless a detach flag is present
pub fn inject_detach(args: &[String]) -> Vec<String> {
    let mut out = args.to_vec();
    let separator = out.iter().position(|a| a == "--").unwrap_or(out.len());
    let detached = out[..separator]
        .iter()
        .any(|a| a == "-d" || a == "--detach");
    if detached {
        return out;
    }
    if let Some(up) = out[..separator].iter().position(|a| a == "up") {
        out.insert(up + 1, "--detach".to_string());
    }
    out
}

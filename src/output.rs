//! Shared output for weekplan commands.
//!
//! With `--json` every command prints one envelope on stdout:
//!
//! ```text
//! {"schema_version":"weekplan.v1","command":"task add","status":"success","data":{…}}
//! {"schema_version":"weekplan.v1","command":"task add","status":"error","error":{…}}
//! ```
//!
//! Without it, successes print a short human report and errors go to
//! stderr.

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};

pub const SCHEMA_VERSION: &str = "weekplan.v1";

/// Command groups whose first argument is itself a subcommand
const GROUPS: [&str; 6] = ["week", "task", "block", "step", "card", "sub"];

/// Global options that take a value
const VALUE_FLAGS: [&str; 3] = ["--week", "--data-dir", "--config"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Human report for one command: a header line, `key: value` facts,
/// free-form lines, then warnings and suggested next commands.
#[derive(Debug, Clone, Default)]
pub struct HumanOutput {
    header: String,
    facts: Vec<(String, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.facts.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.lines.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }

    pub fn render(&self) -> String {
        let width = self.facts.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        let mut out = vec![self.header.clone()];
        for (key, value) in &self.facts {
            if value.is_empty() {
                out.push(format!("  {key}"));
            } else {
                out.push(format!("  {key}:{:pad$} {value}", "", pad = width - key.len()));
            }
        }
        if !self.lines.is_empty() {
            out.push(String::new());
            out.extend(self.lines.iter().map(|line| format!("  {line}")));
        }
        out.extend(self.warnings.iter().map(|warning| format!("warning: {warning}")));
        out.extend(self.next_steps.iter().map(|step| format!("next: {step}")));
        out.join("\n")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Success,
    Error,
}

#[derive(Serialize)]
struct Envelope<'a, B: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: Status,
    #[serde(flatten)]
    body: B,
    #[serde(skip_serializing_if = "is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    next_steps: &'a [String],
}

fn is_empty(items: &&[String]) -> bool {
    items.is_empty()
}

#[derive(Serialize)]
struct Success<'a, T: Serialize> {
    data: &'a T,
}

#[derive(Serialize)]
struct Failure<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn print_json<B: Serialize>(envelope: &Envelope<'_, B>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return print_json(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: Status::Success,
            body: Success { data },
            warnings: human.map(|h| h.warnings.as_slice()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.as_slice()).unwrap_or_default(),
        });
    }
    if let Some(human) = human.filter(|_| !options.quiet) {
        println!("{}", human.render());
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = error_hint(err);
    if json {
        let message = err.to_string();
        let next_steps: Vec<String> = hint.into_iter().collect();
        return print_json(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: Status::Error,
            body: Failure {
                error: ErrorBody {
                    message: &message,
                    code: err.exit_code(),
                    kind: error_kind(err),
                    details: err.details(),
                },
            },
            warnings: &[],
            next_steps: &next_steps,
        });
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn infer_command_name_from_args() -> String {
    infer_command_name(std::env::args().skip(1))
}

/// The subcommand path named by `args`, e.g. `task comment add`, with
/// options and their values skipped.
fn infer_command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut words = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        words.push(arg);
        if !wants_subcommand(&words) {
            break;
        }
    }

    if words.is_empty() {
        "weekplan".to_string()
    } else {
        words.join(" ")
    }
}

fn wants_subcommand(words: &[String]) -> bool {
    match words {
        [group] => GROUPS.contains(&group.as_str()),
        [task, comment] => task == "task" && comment == "comment",
        _ => false,
    }
}

fn error_kind(err: &Error) -> &'static str {
    if err.exit_code() == exit_codes::USER_ERROR {
        "user_error"
    } else {
        "operation_failed"
    }
}

fn error_hint(err: &Error) -> Option<String> {
    let hint = match err {
        Error::TaskNotFound { week, .. } => format!("weekplan week show --week {week}"),
        Error::AmbiguousTaskId { .. } => "use a longer task id prefix".to_string(),
        Error::InvalidWeek(_) => "pass any date of the week as YYYY-MM-DD".to_string(),
        Error::InvalidConfig(_) => "fix weekplan.toml then retry".to_string(),
        Error::LockFailed(_) => "retry once the other weekplan process finishes".to_string(),
        Error::Io(_) | Error::OperationFailed(_) => {
            "check the planner file and its directory, then retry".to_string()
        }
        _ => return None,
    };
    Some(hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: &[&str]) -> String {
        infer_command_name(raw.iter().map(|s| s.to_string()))
    }

    #[test]
    fn command_names() {
        assert_eq!(name(&[]), "weekplan");
        assert_eq!(name(&["serve", "--port", "1"]), "serve");
        assert_eq!(name(&["task", "add", "Title"]), "task add");
        assert_eq!(
            name(&["--json", "--week", "2024-01-01", "block", "rm", "x"]),
            "block rm"
        );
    }

    #[test]
    fn nested_command_names() {
        assert_eq!(name(&["sub", "add", "t", "b", "p", "text"]), "sub add");
        assert_eq!(name(&["task", "comment", "add", "t", "hi"]), "task comment add");
        assert_eq!(name(&["-q", "task", "comment", "rm", "t", "c"]), "task comment rm");
        assert_eq!(name(&["task", "toggle-item", "t", "comment"]), "task toggle-item");
    }

    #[test]
    fn human_report_layout() {
        let mut out = HumanOutput::new("Task added");
        out.push_summary("title", "Write report");
        out.push_summary("progress", "1/3");
        out.push_detail("0. text abc: note");
        out.push_warning("nothing else");
        assert_eq!(
            out.render(),
            "Task added\n  title:    Write report\n  progress: 1/3\n\n  0. text abc: note\nwarning: nothing else"
        );
        assert_eq!(HumanOutput::new("Week").render(), "Week");
    }

    #[test]
    fn error_envelope_shape() {
        let err = Error::InvalidWeek("soon".to_string());
        let message = err.to_string();
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            command: "week show",
            status: Status::Error,
            body: Failure {
                error: ErrorBody {
                    message: &message,
                    code: err.exit_code(),
                    kind: error_kind(&err),
                    details: None,
                },
            },
            warnings: &[],
            next_steps: &[],
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["kind"], "user_error");
        assert_eq!(value["error"]["code"], 2);
        assert!(value.get("warnings").is_none());
    }
}

//! Step variant codec.
//!
//! Three shapes are involved:
//!
//! ```text
//! StepSpec  --expand_step-->  BuildStep  --encode_step-->  StepRecord
//! StepSpec  <--flatten_step-- BuildStep  <--decode_step--  StepRecord
//! ```
//!
//! `StepSpec` is what users write, `BuildStep` is the closed sum type the
//! rest of the crate reasons about, and `StepRecord` is what the server
//! exchanges (a runner type plus a property bag). Unknown engines are
//! rejected on both edges: by tag in [`expand_step`], by runner type in
//! [`decode_step`].

use std::collections::BTreeMap;

use tcform_core::{BuildStep, CommandLine, Powershell, StepBody, StepEngine, StepRecord, StepSpec};

use crate::error::CodecError;

const STEP_MODE: &str = "teamcity.step.mode";

const CMD_EXECUTABLE: &str = "command.executable";
const CMD_PARAMETERS: &str = "command.parameters";
const CMD_SCRIPT_CONTENT: &str = "script.content";
const CMD_USE_CUSTOM_SCRIPT: &str = "use.custom.script";

const PS_SCRIPT_MODE: &str = "jetbrains_powershell_script_mode";
const PS_SCRIPT_FILE: &str = "jetbrains_powershell_script_file";
const PS_SCRIPT_ARGS: &str = "jetbrains_powershell_scriptArguments";
const PS_SCRIPT_CODE: &str = "jetbrains_powershell_script_code";
const PS_EXECUTION: &str = "jetbrains_powershell_execution";

/// Runner kinds the server reports, one per supported engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerKind {
    CommandLine,
    Powershell,
}

impl RunnerKind {
    /// The server's runner type identifier.
    pub fn runner_type(self) -> &'static str {
        match self {
            RunnerKind::CommandLine => "simpleRunner",
            RunnerKind::Powershell => "jetbrains_powershell",
        }
    }

    pub fn from_runner_type(runner_type: &str) -> Result<Self, CodecError> {
        match runner_type {
            "simpleRunner" => Ok(RunnerKind::CommandLine),
            "jetbrains_powershell" => Ok(RunnerKind::Powershell),
            other => Err(CodecError::UnsupportedStepType {
                tag: other.to_string(),
            }),
        }
    }

    pub fn engine(self) -> StepEngine {
        match self {
            RunnerKind::CommandLine => StepEngine::CmdLine,
            RunnerKind::Powershell => StepEngine::Powershell,
        }
    }

    pub fn for_engine(engine: StepEngine) -> Self {
        match engine {
            StepEngine::CmdLine => RunnerKind::CommandLine,
            StepEngine::Powershell => RunnerKind::Powershell,
        }
    }
}

// ---------------------------------------------------------------------------
// Declarative <-> typed
// ---------------------------------------------------------------------------

/// Expand a declared step into its typed variant.
///
/// A non-empty `file` selects file mode and wins over `code`; otherwise the
/// step is inline, and an absent or empty `code` is an empty script body.
pub fn expand_step(spec: &StepSpec) -> Result<BuildStep, CodecError> {
    let engine = StepEngine::from_tag(&spec.step_type).ok_or_else(|| {
        CodecError::UnsupportedStepType {
            tag: spec.step_type.clone(),
        }
    })?;

    let file = spec.file.as_deref().filter(|f| !f.is_empty());
    let args = spec.args.clone().unwrap_or_default();
    let code = spec.code.clone().unwrap_or_default();

    let body = match (engine, file) {
        (StepEngine::CmdLine, Some(path)) => StepBody::CommandLine(CommandLine::Executable {
            path: path.to_string(),
            args,
        }),
        (StepEngine::CmdLine, None) => {
            StepBody::CommandLine(CommandLine::Script { content: code })
        }
        (StepEngine::Powershell, Some(path)) => StepBody::Powershell(Powershell::ScriptFile {
            path: path.to_string(),
            args,
        }),
        (StepEngine::Powershell, None) => StepBody::Powershell(Powershell::Code { code }),
    };

    Ok(BuildStep {
        id: None,
        name: spec.name.clone().unwrap_or_default(),
        body,
    })
}

/// Flatten a typed step into its declarative record.
///
/// Only non-empty fields are emitted, so a file-mode step never carries
/// `code` and an inline step never carries `file` or `args`.
pub fn flatten_step(step: &BuildStep) -> StepSpec {
    let (file, args, inline) = match &step.body {
        StepBody::CommandLine(CommandLine::Executable { path, args })
        | StepBody::Powershell(Powershell::ScriptFile { path, args }) => {
            (path.as_str(), args.as_str(), "")
        }
        StepBody::CommandLine(CommandLine::Script { content }) => ("", "", content.as_str()),
        StepBody::Powershell(Powershell::Code { code }) => ("", "", code.as_str()),
    };

    let mut spec = StepSpec {
        step_type: step.body.engine().tag().to_string(),
        name: non_empty(&step.name),
        ..Default::default()
    };
    if !file.is_empty() {
        spec.file = non_empty(file);
        spec.args = non_empty(args);
    } else if !inline.is_empty() {
        spec.code = non_empty(inline);
    }
    spec
}

// ---------------------------------------------------------------------------
// Typed <-> runner record
// ---------------------------------------------------------------------------

/// Encode a typed step as the property bag the server expects.
pub fn encode_step(step: &BuildStep) -> StepRecord {
    let mut properties = BTreeMap::new();
    properties.insert(STEP_MODE.to_string(), "default".to_string());

    let runner = match &step.body {
        StepBody::CommandLine(cmd) => {
            match cmd {
                CommandLine::Executable { path, args } => {
                    properties.insert(CMD_EXECUTABLE.into(), path.clone());
                    if !args.is_empty() {
                        properties.insert(CMD_PARAMETERS.into(), args.clone());
                    }
                }
                CommandLine::Script { content } => {
                    properties.insert(CMD_SCRIPT_CONTENT.into(), content.clone());
                    properties.insert(CMD_USE_CUSTOM_SCRIPT.into(), "true".into());
                }
            }
            RunnerKind::CommandLine
        }
        StepBody::Powershell(ps) => {
            properties.insert(PS_EXECUTION.into(), "PS1".into());
            match ps {
                Powershell::ScriptFile { path, args } => {
                    properties.insert(PS_SCRIPT_MODE.into(), "FILE".into());
                    properties.insert(PS_SCRIPT_FILE.into(), path.clone());
                    if !args.is_empty() {
                        properties.insert(PS_SCRIPT_ARGS.into(), args.clone());
                    }
                }
                Powershell::Code { code } => {
                    properties.insert(PS_SCRIPT_MODE.into(), "CODE".into());
                    properties.insert(PS_SCRIPT_CODE.into(), code.clone());
                }
            }
            RunnerKind::Powershell
        }
    };

    StepRecord {
        id: step.id.clone(),
        name: step.name.clone(),
        runner_type: runner.runner_type().to_string(),
        properties,
    }
}

/// Decode a server record into a typed step.
///
/// Fails with [`CodecError::UnsupportedStepType`] for runner types with no
/// variant, so an engine the codec does not understand is reported rather
/// than silently dropped.
pub fn decode_step(record: &StepRecord) -> Result<BuildStep, CodecError> {
    let prop = |key: &str| record.property(key).unwrap_or_default().to_string();

    let body = match RunnerKind::from_runner_type(&record.runner_type)? {
        RunnerKind::CommandLine => {
            let executable = prop(CMD_EXECUTABLE);
            if executable.is_empty() {
                StepBody::CommandLine(CommandLine::Script {
                    content: prop(CMD_SCRIPT_CONTENT),
                })
            } else {
                StepBody::CommandLine(CommandLine::Executable {
                    path: executable,
                    args: prop(CMD_PARAMETERS),
                })
            }
        }
        RunnerKind::Powershell => {
            let file = prop(PS_SCRIPT_FILE);
            if file.is_empty() {
                StepBody::Powershell(Powershell::Code {
                    code: prop(PS_SCRIPT_CODE),
                })
            } else {
                StepBody::Powershell(Powershell::ScriptFile {
                    path: file,
                    args: prop(PS_SCRIPT_ARGS),
                })
            }
        }
    };

    Ok(BuildStep {
        id: record.id.clone(),
        name: record.name.clone(),
        body,
    })
}

/// Decode then flatten: what the reconciler does for every fetched step.
pub fn flatten_record(record: &StepRecord) -> Result<StepSpec, CodecError> {
    decode_step(record).map(|step| flatten_step(&step))
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

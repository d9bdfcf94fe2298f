//! Roundtrip serialisation tests for the declarative types.
//!
//! Each `#[case]` is isolated; no shared state.

use rstest::rstest;
use serde_yaml::Value;

use tcform_core::types::{
    BuildConfigSpec, ParamMap, ParameterMaps, ProjectSpec, StepSpec, VcsRootSpec,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn params(pairs: &[(&str, &str)]) -> ParamMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

fn minimal_config() -> BuildConfigSpec {
    BuildConfigSpec {
        name: "Build".into(),
        project_id: "App".into(),
        ..Default::default()
    }
}

fn full_config() -> BuildConfigSpec {
    BuildConfigSpec {
        name: "Build".into(),
        project_id: "App".into(),
        description: Some("Compiles everything".into()),
        params: ParameterMaps {
            env_params: Some(params(&[("JAVA_HOME", "/opt/jdk")])),
            sys_params: Some(params(&[("gradle.opts", "-Xmx2g")])),
            config_params: Some(params(&[("branch", "main")])),
        },
        vcs_root: Some(vec![VcsRootSpec {
            id: "App_Git".into(),
            checkout_rules: vec!["+:src".into(), "-:docs".into()],
        }]),
        step: Some(vec![
            StepSpec {
                step_type: "cmd_line".into(),
                name: Some("compile".into()),
                file: Some("build.sh".into()),
                args: Some("--all".into()),
                code: None,
            },
            StepSpec {
                step_type: "powershell".into(),
                code: Some("Write-Host hi".into()),
                ..Default::default()
            },
        ]),
    }
}

fn unicode_config() -> BuildConfigSpec {
    BuildConfigSpec {
        name: "ビルド-сборка".into(),
        project_id: "проект".into(),
        description: Some("émojis 🚀 & <>\"'".into()),
        params: ParameterMaps {
            config_params: Some(params(&[("ключ", "値")])),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn empty_maps_config() -> BuildConfigSpec {
    BuildConfigSpec {
        name: "Build".into(),
        project_id: "App".into(),
        params: ParameterMaps {
            env_params: Some(ParamMap::new()),
            ..Default::default()
        },
        vcs_root: Some(vec![]),
        step: Some(vec![]),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Parameterised roundtrip test
// ---------------------------------------------------------------------------

#[rstest]
#[case("minimal", minimal_config())]
#[case("all_fields", full_config())]
#[case("unicode_strings", unicode_config())]
#[case("explicitly_empty", empty_maps_config())]
fn build_config_spec_roundtrip(#[case] label: &str, #[case] spec: BuildConfigSpec) {
    let yaml = serde_yaml::to_string(&spec)
        .unwrap_or_else(|e| panic!("[{label}] serialize failed: {e}"));
    let back: BuildConfigSpec = serde_yaml::from_str(&yaml)
        .unwrap_or_else(|e| panic!("[{label}] deserialize failed: {e}"));
    assert_eq!(spec, back, "[{label}] yaml:\n{yaml}");
}

#[rstest]
#[case(None)]
#[case(Some("described"))]
fn project_spec_roundtrip(#[case] description: Option<&str>) {
    let spec = ProjectSpec {
        name: "App".into(),
        description: description.map(str::to_string),
        params: ParameterMaps {
            sys_params: Some(params(&[("a", "b")])),
            ..Default::default()
        },
    };
    let yaml = serde_yaml::to_string(&spec).expect("serialize");
    let back: ProjectSpec = serde_yaml::from_str(&yaml).expect("deserialize");
    assert_eq!(spec, back);
}

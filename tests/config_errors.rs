// tests/config_errors.rs

use std::io::Write;

use tempfile::NamedTempFile;

use assetpipe::config::load_and_validate;
use assetpipe::errors::PipelineError;

fn load(contents: &str) -> Result<assetpipe::config::Config, PipelineError> {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    load_and_validate(file.path(), true)
}

#[test]
fn overlapping_destinations_return_config_error() {
    let result = load(
        r#"
[styles]
dest = "assets"

[images]
dest = "assets/img"
"#,
    );

    match result {
        Err(PipelineError::ConfigError(msg)) => {
            assert!(msg.contains("overlap"), "{msg}");
            assert!(msg.contains("styles") && msg.contains("images"), "{msg}");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_section_is_a_toml_error() {
    let result = load(
        r#"
[stylez]
src = ["a.css"]
"#,
    );
    assert!(matches!(result, Err(PipelineError::TomlError(_))), "{result:?}");
}

#[test]
fn misspelled_group_keys_are_toml_errors() {
    for section in ["styles", "scripts", "images", "fonts"] {
        let result = load(&format!("[{section}]\nscr = [\"src/**/*\"]\n"));
        match result {
            Err(PipelineError::TomlError(e)) => {
                assert!(e.to_string().contains("scr"), "[{section}]: {e}")
            }
            other => panic!("[{section}]: expected TomlError, got {other:?}"),
        }
    }
}

#[test]
fn section_specific_keys_still_parse() -> Result<(), PipelineError> {
    let cfg = load(
        r#"
[scripts]
src = ["js/**/*.js"]
target = "es2020"

[images]
jpeg_quality = 65
"#,
    )?;
    assert_eq!(cfg.scripts.src, vec!["js/**/*.js".to_string()]);
    assert_eq!(cfg.script_target, "es2020");
    assert_eq!(cfg.jpeg_quality, 65);
    Ok(())
}

#[test]
fn unknown_script_target_is_rejected() {
    let result = load(
        r#"
[scripts]
target = "es1999"
"#,
    );
    match result {
        Err(PipelineError::ConfigError(msg)) => assert!(msg.contains("[scripts].target"), "{msg}"),
        other => panic!("Expected ConfigError, got: {other:?}"),
    }
}

#[test]
fn serve_section_is_validated() {
    let bad_regex = load(
        r#"
[serve]
cmd = "node server.js"
ready_pattern = "listening ("
"#,
    );
    assert!(matches!(bad_regex, Err(PipelineError::ConfigError(_))));

    let bad_duration = load(
        r#"
[serve]
cmd = "node server.js"
ready_after = "soon"
"#,
    );
    assert!(matches!(bad_duration, Err(PipelineError::ConfigError(_))));

    let ok = load(
        r#"
[serve]
cmd = "node server.js"
watch = ["server/**/*.js"]
ready_after = "1500ms"
"#,
    )
    .expect("valid serve section");
    let serve = ok.serve.expect("serve present");
    assert_eq!(serve.env_var, "NODE_ENV");
    assert_eq!(serve.upstream, "http://127.0.0.1:5000");
}

#[test]
fn missing_order_entry_fails_the_step_not_the_load() {
    let cfg = load(
        r#"
[scripts]
order = ["src/scripts/missing.js"]
"#,
    );
    assert!(cfg.is_ok(), "order entries are checked when sources are collected");
}

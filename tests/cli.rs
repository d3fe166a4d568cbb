use assert_cmd::Command;
use predicates::prelude::*;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const ECHO_TWICE: &str = "3,9,4,9,3,9,4,9,99,0";

fn write_program(dir: &TempDir, source: &str) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.path().join("program.txt");
    fs::write(&path, source)?;
    Ok(path)
}

fn intcode() -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("intcode")?;
    cmd.env_remove("INTCODE_STEP_BUDGET")
        .env_remove("INTCODE_INPUT_POLICY")
        .env_remove("INTCODE_ASCII");
    Ok(cmd)
}

#[test]
fn test_run_prints_output() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "104,42,104,-7,99\n")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .assert()
        .success()
        .stdout("42,-7\n");

    Ok(())
}

#[test]
fn test_run_with_input_values() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, ECHO_TWICE)?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--input")
        .arg("-5,8")
        .assert()
        .success()
        .stdout("-5,8\n");

    Ok(())
}

#[test]
fn test_batch_input_exhaustion_fails() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, ECHO_TWICE)?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("-i")
        .arg("1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("input exhausted at pc 4"));

    Ok(())
}

#[test]
fn test_streaming_run_reports_block() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, ECHO_TWICE)?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("-i")
        .arg("1")
        .arg("--streaming")
        .assert()
        .success()
        .stdout("1\n")
        .stderr(predicate::str::contains("blocked on input"));

    Ok(())
}

#[test]
fn test_json_report() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "1,0,0,0,99")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"outcome\": \"halted\""))
        .stdout(predicate::str::contains("\"instructions\": 2"));

    Ok(())
}

#[test]
fn test_budget_stops_early() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "104,1,104,2,99")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--budget")
        .arg("1")
        .assert()
        .success()
        .stdout("1\n")
        .stderr(predicate::str::contains("step budget exhausted"));

    Ok(())
}

#[test]
fn test_ascii_output() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "104,72,104,105,104,10,104,1000,99")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("--ascii")
        .assert()
        .success()
        .stdout("Hi\n1000\n");

    Ok(())
}

#[test]
fn test_checkpoint_files_resume_run() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, ECHO_TWICE)?;
    let checkpoint = temp_dir.path().join("checkpoint.json");

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("-i")
        .arg("5")
        .arg("--streaming")
        .arg("--save-checkpoint")
        .arg(&checkpoint)
        .assert()
        .success()
        .stdout("5\n");

    intcode()?
        .arg("run")
        .arg(&program)
        .arg("-i")
        .arg("6")
        .arg("--load-checkpoint")
        .arg(&checkpoint)
        .assert()
        .success()
        .stdout("6\n");

    Ok(())
}

#[test]
fn test_amplify_series() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(
        &temp_dir,
        "3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0",
    )?;

    intcode()?
        .arg("amplify")
        .arg(&program)
        .arg("--phases")
        .arg("4,3,2,1,0")
        .assert()
        .success()
        .stdout("43210\n");

    Ok(())
}

#[test]
fn test_amplify_rejects_zero_budget() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(
        &temp_dir,
        "3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0",
    )?;

    intcode()?
        .arg("amplify")
        .arg(&program)
        .arg("--phases")
        .arg("4,3,2,1,0")
        .arg("--budget")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("turn budget of zero"));

    Ok(())
}

#[test]
fn test_disasm_lists_instructions() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "1002,4,3,4,33")?;

    intcode()?
        .arg("disasm")
        .arg(&program)
        .assert()
        .success()
        .stdout(predicate::str::contains("MUL  [4], 3, [4]"))
        .stdout(predicate::str::contains("DATA 33"));

    Ok(())
}

#[test]
fn test_invalid_program_file() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let program = write_program(&temp_dir, "1,2,three")?;

    intcode()?
        .arg("run")
        .arg(&program)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'three' at position 2"));

    Ok(())
}

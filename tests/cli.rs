use std::process::{Command, Output};

use log::info;

/// Run the editor binary with `args` and capture its output. `Command::output`
/// wires the child's stdin to the null device, so code paths that need a real
/// terminal fail fast instead of taking the test runner's TTY over.
fn kilo(args: &[&str]) -> Output {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut command = Command::new(env!("CARGO_BIN_EXE_kilo"));
    command.args(args);
    let output = command.output().expect("could not spawn the editor binary");
    info!("{command:?} exited with {output:#?}");
    output
}

fn stderr(output: &Output) -> String { String::from_utf8_lossy(&output.stderr).into_owned() }

#[test]
fn version_flag_prints_the_version() {
    let output = kilo(&["--version"]);
    assert!(output.status.success());
    assert_eq!(output.stdout, format!("kilo {}\n", env!("CARGO_PKG_VERSION")).into_bytes());
}

#[test]
fn unknown_options_are_rejected() {
    let output = kilo(&["--frobnicate"]);
    assert!(!output.status.success());
    assert_eq!(stderr(&output), "Error: UnrecognizedOption(\"--frobnicate\")\n");
}

#[test]
fn at_most_one_file_argument_is_accepted() {
    let output = kilo(&["one.txt", "two.txt"]);
    assert!(!output.status.success());
    assert_eq!(stderr(&output), "Error: TooManyArguments(3)\n");
}

#[test]
fn running_without_a_terminal_is_fatal() {
    // With or without a file argument, raw mode cannot be enabled on the
    // null device, and the editor must exit with an I/O error.
    for args in [&[][..], &["scratch.txt"][..]] {
        let output = kilo(args);
        assert!(!output.status.success(), "{args:?} should not succeed without a TTY");
        assert!(stderr(&output).starts_with("Error: Io"), "unexpected stderr for {args:?}");
    }
}

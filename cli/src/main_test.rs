use super::*;

use clap::CommandFactory;

#[test]
fn command_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn endpoint_trims_trailing_slash() {
    assert_eq!(endpoint("http://localhost:3000/", "/healthz"), "http://localhost:3000/healthz");
    assert_eq!(endpoint("http://localhost:3000", "/api/axiom-graph"), "http://localhost:3000/api/axiom-graph");
}

#[test]
fn compile_args_default_to_compiler_defaults() {
    let cli = Cli::try_parse_from(["apeiron", "compile", "program.hpmdl"]).unwrap();
    let Command::Compile(args) = cli.command else {
        panic!("expected compile command");
    };
    assert_eq!(args.out, PathBuf::from("out"));
    assert_eq!(CompilerOptions::from(args.options), CompilerOptions::default());
}

#[test]
fn compile_args_override_evolution_parameters() {
    let cli = Cli::try_parse_from([
        "apeiron",
        "compile",
        "program.hpmdl",
        "--out",
        "artifacts",
        "--max-steps",
        "50",
        "--time-step",
        "0.5",
    ])
    .unwrap();
    let Command::Compile(args) = cli.command else {
        panic!("expected compile command");
    };
    let options = CompilerOptions::from(args.options);
    assert_eq!(options.max_steps, 50);
    assert!((options.time_step - 0.5).abs() < f64::EPSILON);
}

#[test]
fn remote_compile_parses_file() {
    let cli = Cli::try_parse_from(["apeiron", "--base-url", "http://example.test", "remote", "compile", "a.hpmdl"]).unwrap();
    assert_eq!(cli.base_url, "http://example.test");
    assert!(matches!(
        cli.command,
        Command::Remote(RemoteCommand { command: RemoteSubcommand::Compile { ref file } }) if file == Path::new("a.hpmdl")
    ));
}

#[test]
fn graph_flag_defaults_off() {
    let cli = Cli::try_parse_from(["apeiron", "graph", "a.hpmdl"]).unwrap();
    assert!(matches!(cli.command, Command::Graph { graphml: false, .. }));
}

#[test]
fn compile_error_carries_code() {
    let err = CliError::from(hpmdl::check("axiom : 1").unwrap_err());
    assert!(err.to_string().starts_with("E_PARSE: parse error"));
}

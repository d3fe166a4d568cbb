use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use intcode::config::{self, budget_from_signed, ConfigError, CONFIG};
use intcode::text::split_text_output;
use intcode::{
    Checkpoint, CheckpointStore, InputPolicy, Machine, Pipeline, PipelineError, Program,
    ProgramError, RunOutcome, VMError,
};
use log::{debug, info};
use std::io::{self, Write};
use std::process;
use thiserror::Error;

#[derive(Debug, Error)]
enum AppError {
    #[error("VM error: {0}")]
    VM(#[from] VMError),

    #[error("Program error: {0}")]
    Program(#[from] ProgramError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Other(s)
    }
}

fn program_arg() -> Arg {
    Arg::new("program")
        .value_name("FILE")
        .help("Program image (comma-separated integers)")
        .required(true)
}

fn budget_arg(help: &'static str) -> Arg {
    Arg::new("budget")
        .short('b')
        .long("budget")
        .value_name("STEPS")
        .help(help)
        .allow_hyphen_values(true)
        .value_parser(clap::value_parser!(i64))
}

fn cli() -> Command {
    Command::new("intcode")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Intcode virtual machine")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log run outcomes and checkpoints")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("run")
                .about("Run a program once and print its output")
                .arg(program_arg())
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("VALUES")
                        .help("Comma-separated input values (can be used multiple times)")
                        .allow_hyphen_values(true)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("text")
                        .short('t')
                        .long("text")
                        .value_name("STRING")
                        .help("Input text, queued as character codes"),
                )
                .arg(
                    Arg::new("ascii")
                        .long("ascii")
                        .help("Render output as text")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("streaming")
                        .long("streaming")
                        .help("Suspend instead of failing when input runs out")
                        .action(ArgAction::SetTrue),
                )
                .arg(budget_arg("Maximum instructions to execute; negative is unbounded"))
                .arg(
                    Arg::new("load-checkpoint")
                        .long("load-checkpoint")
                        .value_name("FILE")
                        .help("Resume from a checkpoint file instead of the program start"),
                )
                .arg(
                    Arg::new("save-checkpoint")
                        .long("save-checkpoint")
                        .value_name("FILE")
                        .help("Write a checkpoint file when the run returns"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print a JSON report")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("interactive")
                .about("Run a text program, reading input lines from the terminal")
                .arg(program_arg()),
        )
        .subcommand(
            Command::new("amplify")
                .about("Run one machine per phase setting, chained output to input")
                .arg(program_arg())
                .arg(
                    Arg::new("phases")
                        .long("phases")
                        .value_name("VALUES")
                        .help("Comma-separated phase settings, one per machine")
                        .required(true),
                )
                .arg(
                    Arg::new("signal")
                        .long("signal")
                        .value_name("VALUE")
                        .help("Initial input to the first machine")
                        .allow_hyphen_values(true)
                        .value_parser(clap::value_parser!(i64))
                        .default_value("0"),
                )
                .arg(
                    Arg::new("feedback")
                        .long("feedback")
                        .help("Feed the last machine's output back into the first")
                        .action(ArgAction::SetTrue),
                )
                .arg(budget_arg("Instructions per machine per turn; negative is unbounded")),
        )
        .subcommand(
            Command::new("disasm")
                .about("Print a linear disassembly of a program")
                .arg(program_arg()),
        )
}

fn main() {
    let matches = cli().get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    config::init();

    let result = match matches.subcommand() {
        Some(("run", sub)) => run_program(sub),
        Some(("interactive", sub)) => run_interactive(sub),
        Some(("amplify", sub)) => run_amplifiers(sub),
        Some(("disasm", sub)) => disassemble(sub),
        _ => Err(AppError::Other("unknown command".to_string())),
    };

    if let Err(err) = result {
        eprintln!("{} {}", "Error:".red().bold(), err);
        process::exit(1);
    }
}

fn load_program(matches: &ArgMatches) -> Result<Program, AppError> {
    let path = matches
        .get_one::<String>("program")
        .ok_or_else(|| AppError::Other("missing program file".to_string()))?;
    let program = Program::from_path(path)?;
    info!("loaded {} cells from {}", program.len(), path);
    Ok(program)
}

fn parse_values(list: &str) -> Result<Vec<i64>, AppError> {
    list.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<i64>()
                .map_err(|_| AppError::Other(format!("invalid value '{}'", token)))
        })
        .collect()
}

fn run_program(matches: &ArgMatches) -> Result<(), AppError> {
    let program = load_program(matches)?;
    let mut settings = CONFIG.clone();
    if matches.get_flag("streaming") {
        settings.input_policy = InputPolicy::Streaming;
    }
    if matches.get_flag("ascii") {
        settings.ascii = true;
    }
    if let Some(&budget) = matches.get_one::<i64>("budget") {
        settings.step_budget = budget_from_signed(budget);
    }
    debug!("run settings: {:?}", settings);

    let mut machine = Machine::new(program.cells(), settings.input_policy);
    if let Some(path) = matches.get_one::<String>("load-checkpoint") {
        machine.restore(&Checkpoint::load_from_path(path)?);
    }
    if let Some(lists) = matches.get_many::<String>("input") {
        for list in lists {
            machine.extend_input(parse_values(list)?);
        }
    }
    if let Some(text) = matches.get_one::<String>("text") {
        machine.push_text(text);
    }

    let outcome = machine.run(settings.step_budget)?;

    if let Some(path) = matches.get_one::<String>("save-checkpoint") {
        machine.checkpoint().save_to_path(path)?;
        info!("checkpoint written to {}", path);
    }

    if matches.get_flag("json") {
        let report = serde_json::json!({
            "outcome": outcome,
            "output": machine.output(),
            "pc": machine.pc(),
            "instructions": machine.instructions_executed(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if settings.ascii {
        let (text, answer) = split_text_output(machine.output());
        print!("{}", text);
        if let Some(answer) = answer {
            println!("{}", answer);
        }
    } else {
        let values: Vec<String> = machine.output().iter().map(i64::to_string).collect();
        println!("{}", values.join(","));
    }

    if outcome != RunOutcome::Halted {
        eprintln!("{}", format!("Machine {} at pc {}", outcome, machine.pc()).yellow());
    }
    Ok(())
}

fn run_interactive(matches: &ArgMatches) -> Result<(), AppError> {
    let program = load_program(matches)?;
    let mut machine = Machine::streaming(program.cells());
    let mut checkpoints = CheckpointStore::new();

    println!("intcode interactive session");
    println!("Commands: :save NAME, :restore NAME, :list, :reset, :quit");

    let mut rl = rustyline::DefaultEditor::new().map_err(|e| AppError::Other(e.to_string()))?;

    loop {
        let outcome = machine.run(None)?;
        let (text, answer) = split_text_output(&machine.take_output());
        print!("{}", text);
        if let Some(answer) = answer {
            println!("{}", answer);
        }

        if outcome == RunOutcome::Halted {
            println!("{}", "Program halted".green());
            break;
        }
        io::stdout().flush()?;

        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("Interrupted (Ctrl+C)");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("EOF (Ctrl+D)");
                break;
            }
            Err(e) => {
                return Err(AppError::Other(format!("Error reading input: {}", e)));
            }
        };

        if let Err(e) = rl.add_history_entry(line.as_str()) {
            return Err(AppError::Other(format!("Error adding to history: {}", e)));
        }

        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some(":quit"), _) | (Some(":exit"), _) => break,
            (Some(":save"), Some(label)) => {
                checkpoints.save(label, &machine);
                println!("Saved checkpoint '{}'", label);
            }
            (Some(":restore"), Some(label)) => match checkpoints.restore(label, &mut machine) {
                Ok(()) => println!("Restored checkpoint '{}'", label),
                Err(err) => eprintln!("{}", err.to_string().red()),
            },
            (Some(":list"), _) => {
                for label in checkpoints.labels() {
                    println!("  {}", label);
                }
            }
            (Some(":reset"), _) => {
                machine.reset();
                println!("Machine reset");
            }
            _ => {
                machine.push_text(&line);
                machine.push_input('\n' as i64);
            }
        }
    }

    Ok(())
}

fn run_amplifiers(matches: &ArgMatches) -> Result<(), AppError> {
    let program = load_program(matches)?;
    let phases = parse_values(
        matches
            .get_one::<String>("phases")
            .ok_or_else(|| AppError::Other("missing phases".to_string()))?,
    )?;
    let signal = matches.get_one::<i64>("signal").copied().unwrap_or(0);
    let budget = matches
        .get_one::<i64>("budget")
        .copied()
        .map_or(CONFIG.step_budget, budget_from_signed);

    let mut pipeline = Pipeline::amplifiers(program.cells(), &phases, matches.get_flag("feedback"))
        .with_turn_budget(budget);
    let emitted = pipeline.run(&[signal])?;

    match emitted.last() {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => Err(AppError::Other("pipeline produced no output".to_string())),
    }
}

fn disassemble(matches: &ArgMatches) -> Result<(), AppError> {
    let program = load_program(matches)?;
    print!("{}", program.dump());
    Ok(())
}

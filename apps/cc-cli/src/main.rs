use clap::{Parser, Subcommand, ValueEnum};
use cc_controls::RefillCircuit;
use cc_logic::{Command, CryoTwin, TwinStatus};
use cc_project::{ProjectError, TwinConfig};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "cc-cli")]
#[command(about = "CryoTwin CLI - cryogenic cooling loop digital twin", long_about = None)]
struct Cli {
    /// Log sequencer and interlock activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a twin configuration file
    Validate {
        /// Path to the YAML or JSON configuration
        config_path: PathBuf,
    },
    /// Print the default configuration as YAML
    Defaults,
    /// Drive the twin for a fixed duration and print a CSV trace
    Run {
        /// Configuration file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Time step in seconds
        #[arg(long, default_value_t = 0.1)]
        dt: f64,
        /// Simulated duration in seconds
        #[arg(long, default_value_t = 600.0)]
        seconds: f64,
        /// Heat load on the crystal in watts
        #[arg(long, default_value_t = 0.0)]
        load: f64,
        /// Operator command issued on the first tick
        #[arg(long, value_enum, default_value_t = StartProcedure::CoolDown)]
        procedure: StartProcedure,
        /// Emit one CSV row every N ticks
        #[arg(long, default_value_t = 10)]
        every: usize,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StartProcedure {
    /// No command; the twin stays OFF
    None,
    CoolDown,
    WarmUp,
    RefillHv,
    RefillSub,
}

impl StartProcedure {
    fn command(self) -> Command {
        match self {
            StartProcedure::None => Command::None,
            StartProcedure::CoolDown => Command::Start,
            StartProcedure::WarmUp => Command::WarmUp,
            StartProcedure::RefillHv => Command::RefillOn(RefillCircuit::HeaterVessel),
            StartProcedure::RefillSub => Command::RefillOn(RefillCircuit::Subcooler),
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArg(String),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    // Stdout carries the CSV trace, so logs go to stderr.
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Defaults => cmd_defaults(),
        Commands::Run {
            config,
            dt,
            seconds,
            load,
            procedure,
            every,
            output,
        } => {
            let options = RunOptions {
                dt,
                seconds,
                load_w: load,
                command: procedure.command(),
                every,
            };
            cmd_run(config.as_deref(), &options, output.as_deref())
        }
    }
}

fn cmd_validate(config_path: &Path) -> CliResult<()> {
    println!("Validating config: {}", config_path.display());
    cc_project::load(config_path)?;
    println!("✓ Config is valid");
    Ok(())
}

fn cmd_defaults() -> CliResult<()> {
    let yaml = cc_project::to_yaml_string(&TwinConfig::default())?;
    print!("{}", yaml);
    Ok(())
}

struct RunOptions {
    dt: f64,
    seconds: f64,
    load_w: f64,
    command: Command,
    every: usize,
}

impl RunOptions {
    fn validate(&self) -> CliResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(CliError::InvalidArg(format!("--dt must be positive, got {}", self.dt)));
        }
        if !(self.seconds.is_finite() && self.seconds >= 0.0) {
            return Err(CliError::InvalidArg(format!(
                "--seconds must be non-negative, got {}",
                self.seconds
            )));
        }
        if self.every == 0 {
            return Err(CliError::InvalidArg("--every must be at least 1".to_string()));
        }
        Ok(())
    }

    fn ticks(&self) -> usize {
        (self.seconds / self.dt).round() as usize
    }
}

const CSV_HEADER: &str = "time_s,T5_K,T6_K,PT1_bar,PT3_bar,LT19_pct,LT23_pct,FT18_lpm,state\n";

fn push_row(csv: &mut String, time_s: f64, status: &TwinStatus) {
    let s = &status.state;
    // Writing into a String cannot fail.
    let _ = writeln!(
        csv,
        "{:.3},{:.3},{:.3},{:.4},{:.4},{:.2},{:.2},{:.3},{}",
        time_s,
        s.supply_temp_k,
        s.return_temp_k,
        s.loop_pressure_bar,
        s.hv_pressure_bar,
        s.sub_level_pct,
        s.hv_level_pct,
        s.flow_lpm,
        status.operating_state,
    );
}

fn run_trace(twin: &mut CryoTwin, options: &RunOptions) -> (String, TwinStatus) {
    twin.set_heat_load(options.load_w);
    let mut csv = String::from(CSV_HEADER);
    let mut status = twin.snapshot_status();
    push_row(&mut csv, 0.0, &status);

    let ticks = options.ticks();
    for tick in 1..=ticks {
        let command = if tick == 1 { options.command } else { Command::None };
        status = twin.tick(options.dt, command);
        if tick % options.every == 0 || tick == ticks {
            push_row(&mut csv, tick as f64 * options.dt, &status);
        }
    }
    (csv, status)
}

fn cmd_run(config_path: Option<&Path>, options: &RunOptions, output: Option<&Path>) -> CliResult<()> {
    options.validate()?;
    let config = match config_path {
        Some(path) => cc_project::load(path)?,
        None => TwinConfig::default(),
    };
    let mut twin = cc_project::build_twin(&config)?;
    info!(
        dt = options.dt,
        seconds = options.seconds,
        load_w = options.load_w,
        "running twin"
    );

    let (csv, last) = run_trace(&mut twin, options);

    if let Some(path) = output {
        std::fs::write(path, &csv)?;
        println!(
            "✓ Wrote {} rows to {} (final state {}, severity {})",
            csv.lines().count().saturating_sub(1),
            path.display(),
            last.operating_state,
            last.alarm_severity
        );
    } else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(csv.as_bytes())?;
    }
    Ok(())
}

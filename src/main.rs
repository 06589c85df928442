use clap::Parser;
use std::fs::{read_to_string, write};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use dispatch_plan::{
    Backend, BalanceMode, Instance, ModelParameters, ParameterSet, SolverConfig, dzn,
};

#[derive(Parser)]
#[command(name = "dispatch-plan")]
#[command(
    about = "Plan plant production and client deliveries for maximum net profit",
    long_about = None
)]
struct Cli {
    /// Instance file (YAML). Solves the built-in reference instance when omitted
    file: Option<PathBuf>,
    /// Solver backend (microlp, cbc)
    #[arg(short, long)]
    backend: Option<Backend>,
    /// Wall-clock limit for the solver, in seconds
    #[arg(short, long)]
    time_limit: Option<f64>,
    /// Allow production above what is delivered
    #[arg(long)]
    allow_surplus: bool,
    /// Also write the instance as a data listing to this path
    #[arg(long)]
    emit_dzn: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether a plan was found
fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let mut instance = match &cli.file {
        Some(path) => {
            let buf = read_to_string(path)?;
            serde_yaml::from_str::<Instance>(&buf)?
        }
        None => Instance {
            parameters: ParameterSet::from(&ModelParameters::reference()),
            solver: SolverConfig::default(),
        },
    };

    if let Some(backend) = cli.backend {
        instance.solver.backend = backend;
    }
    if cli.time_limit.is_some() {
        instance.solver.time_limit = cli.time_limit;
    }
    if cli.allow_surplus {
        instance.solver.balance = BalanceMode::AllowSurplus;
    }

    if let Some(path) = &cli.emit_dzn {
        let params = ModelParameters::try_from(instance.parameters.clone())?;
        write(path, dzn::write(&params))?;
        info!(path = %path.display(), "wrote data listing");
    }

    let result = instance.solve()?;
    println!("{}", serde_yaml::to_string(&result)?);
    Ok(result.status.has_solution())
}

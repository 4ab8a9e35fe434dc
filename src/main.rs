// --- Asignador de grupos por iteración - Archivo principal ---

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use groupshift::algorithm::IterationOutcome;
use groupshift::runner::{build_roster_report, run_roster_iteration};
use groupshift::{GroupingConfig, run_server};

#[derive(Parser)]
#[command(name = "groupshift", version, about = "Asigna grupos de 3 (o 4) minimizando parejas repetidas")]
struct Cli {
    /// Reinicios de la búsqueda local
    #[arg(long, global = true)]
    restarts: Option<usize>,

    /// Hilos para la búsqueda (0 = uno por CPU)
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ejecuta la iteración pendiente del roster y la guarda
    Next {
        roster: PathBuf,
        #[arg(long, env = "GROUPSHIFT_SEED")]
        seed: Option<u64>,
        /// Muestra los grupos sin escribir el roster
        #[arg(long)]
        dry_run: bool,
    },
    /// Imprime la matriz de frecuencia de emparejamientos
    Report {
        roster: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Inicia la API HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn print_outcome(outcome: &IterationOutcome) {
    println!("=== {} (semilla {}) ===", outcome.header, outcome.seed);
    for g in outcome.assignment.groups.iter() {
        println!("{:<10} {:?} conflicto: {}", g.label, g.members, g.conflict);
    }
    if !outcome.absent.is_empty() {
        println!("Ausentes: {:?}", outcome.absent);
    }
    println!(
        "Conflicto total de la iteración: {} (máximo por par: {})",
        outcome.assignment.cost.total, outcome.assignment.cost.max_pair
    );
    if !outcome.recorded {
        println!("(simulación: el roster no fue modificado)");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let mut config = GroupingConfig::from_env();
    if let Some(r) = cli.restarts {
        config.search.restarts = r;
    }
    if let Some(w) = cli.workers {
        config.search.workers = w;
    }

    let result = match cli.command {
        Command::Next { roster, seed, dry_run } => {
            run_roster_iteration(&config, &roster, seed, dry_run).map(|outcome| print_outcome(&outcome))
        }
        Command::Report { roster, json } => build_roster_report(&config, &roster).and_then(|report| {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
            Ok(())
        }),
        Command::Serve { bind } => {
            println!("=== groupshift (API) ===");
            println!("Iniciando servidor en http://{}", bind);
            return match run_server(&bind, config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("error del servidor: {}", e);
                    ExitCode::FAILURE
                }
            };
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

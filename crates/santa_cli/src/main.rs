//! Operator CLI over a local draw database.
//!
//! # Responsibility
//! - Drive participant and draw operations without the HTTP server.
//! - Exit non-zero with the error on stderr when any operation fails.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use santa_core::db::open_db;
use santa_core::{
    AssignmentService, ParticipantService, Scope, SqliteAssignmentRepository,
    SqliteParticipantRepository, Strategy, DEFAULT_MAX_ATTEMPTS,
};

#[derive(Parser)]
#[command(version, about = "Secret Santa draw administration", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, default_value = "santa.sqlite3")]
    db: PathBuf,

    /// Group to operate on; omitted means the global scope
    #[arg(long)]
    group_code: Option<String>,

    /// Log level written to stderr
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the core library is linked
    Ping,
    /// Print the core library version
    Version,
    /// Register a member
    Add {
        name: String,
        #[arg(long)]
        password: String,
    },
    /// Remove a participant and every assignment it takes part in
    Remove { name: String },
    /// List participants of the scope
    List,
    /// Draw a fresh assignment set
    Generate {
        /// shuffle, rotation or legacy
        #[arg(long, default_value = "shuffle")]
        strategy: String,
        #[arg(
            long,
            default_value_t = DEFAULT_MAX_ATTEMPTS,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        max_attempts: u32,
    },
    /// Show whether the scope has a committed draw
    Status,
    /// Print the receiver drawn by a participant
    Lookup { name: String },
    /// Clear the draw and members of the scope
    Reset,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = santa_core::init_logging(&cli.log_level, None) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ping => {
            println!("{}", santa_core::ping());
            return Ok(());
        }
        Commands::Version => {
            println!("santa_core {}", santa_core::core_version());
            return Ok(());
        }
        _ => {}
    }

    let scope = Scope::from_group_code(cli.group_code.as_deref())?;
    let mut conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database {}", cli.db.display()))?;
    debug!("event=cli_command module=cli status=start scope={}", scope);

    match cli.command {
        Commands::Ping | Commands::Version => {}
        Commands::Add { name, password } => {
            let service = ParticipantService::new(SqliteParticipantRepository::try_new(&mut conn)?);
            let participant = service.register(&scope, &name, &password)?;
            println!("added {} to {}", participant.name, scope);
        }
        Commands::Remove { name } => {
            let mut service =
                ParticipantService::new(SqliteParticipantRepository::try_new(&mut conn)?);
            service.remove(&scope, &name)?;
            println!("removed {name} from {scope}");
        }
        Commands::List => {
            let service = ParticipantService::new(SqliteParticipantRepository::try_new(&mut conn)?);
            for participant in service.list(&scope)? {
                println!("{}\t{}", participant.name, participant.role.as_str());
            }
        }
        Commands::Generate {
            strategy,
            max_attempts,
        } => {
            let strategy = Strategy::parse(&strategy, max_attempts)
                .ok_or_else(|| anyhow!("unknown strategy `{strategy}`"))?;
            let repo = SqliteAssignmentRepository::try_new(&mut conn)?;
            let status = AssignmentService::with_strategy(repo, strategy).generate(&scope)?;
            println!(
                "generated {} assignments for {}",
                status.assignment_count, scope
            );
        }
        Commands::Status => {
            let service = AssignmentService::new(SqliteAssignmentRepository::try_new(&mut conn)?);
            let status = service.status(&scope)?;
            println!("generated={}", status.generated);
        }
        Commands::Lookup { name } => {
            let service = AssignmentService::new(SqliteAssignmentRepository::try_new(&mut conn)?);
            println!("{}", service.lookup(&scope, &name)?);
        }
        Commands::Reset => {
            let repo = SqliteAssignmentRepository::try_new(&mut conn)?;
            let summary = AssignmentService::new(repo).reset(&scope)?;
            println!(
                "reset {}: {} assignments and {} participants removed",
                scope, summary.assignments_removed, summary.participants_removed
            );
        }
    }
    Ok(())
}

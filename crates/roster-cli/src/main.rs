use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tracing_subscriber::EnvFilter;

use roster_application::RosterUseCase;
use roster_core::capability::{AuthGateway, DocumentStore, ProfileCache};
use roster_core::config::RosterConfig;
use roster_core::session_state::SessionState;
use roster_infrastructure::{MemoryAuthGateway, MemoryDocumentStore, MemoryProfileCache, TomlProfileCache};
use roster_interaction::{RestAuthGateway, RestDocumentStore};

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: vec![
                "/register".to_string(),
                "/login".to_string(),
                "/logout".to_string(),
                "/add".to_string(),
                "/list".to_string(),
                "/whoami".to_string(),
                "/help".to_string(),
            ],
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

fn print_help() {
    println!("{}", "Commands:".bright_black());
    println!("{}", "  /register <email> <password>       create an account".bright_black());
    println!("{}", "  /login <email> <password>          sign in".bright_black());
    println!("{}", "  /logout                            sign out".bright_black());
    println!("{}", "  /add <name>, <student id>, <dept>  add a student record".bright_black());
    println!("{}", "  /list                              show the roster".bright_black());
    println!("{}", "  /whoami                            show the session".bright_black());
    println!("{}", "  quit                               exit".bright_black());
}

fn print_records(usecase: &RosterUseCase) {
    let list = usecase.records().borrow().clone();
    if list.is_empty() {
        println!("{}", "No student records yet.".bright_black());
        return;
    }
    for record in list.records() {
        println!(
            "{}",
            format!(
                "  {}  {} - {}",
                record.name.bold(),
                record.student_id,
                record.department
            )
            .bright_blue()
        );
    }
}

async fn run_command(usecase: &RosterUseCase, line: &str) {
    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/register" | "/login" => {
            let mut parts = rest.split_whitespace();
            let (Some(email), Some(password)) = (parts.next(), parts.next()) else {
                println!("{}", format!("Usage: {command} <email> <password>").red());
                return;
            };
            let result = if command == "/register" {
                usecase.register(email, password).await
            } else {
                usecase.login(email, password).await
            };
            if let Err(e) = result {
                println!("{}", e.to_string().red());
            }
        }
        "/logout" => {
            if let Err(e) = usecase.logout().await {
                println!("{}", e.to_string().red());
            }
        }
        "/add" => {
            let mut parts = rest.splitn(3, ',');
            let (Some(name), Some(student_id), Some(department)) =
                (parts.next(), parts.next(), parts.next())
            else {
                println!(
                    "{}",
                    "Usage: /add <name>, <student id>, <department>".red()
                );
                return;
            };
            match usecase.add_record(name, student_id, department).await {
                Ok(id) => println!("{}", format!("Record saved ({id})").green()),
                Err(e) => println!("{}", e.to_string().red()),
            }
        }
        "/list" => print_records(usecase),
        "/whoami" => {
            if usecase.initializing() {
                println!("{}", "Checking sign-in status...".yellow());
            }
            match usecase.session_state().borrow().clone() {
                SessionState::Authenticated(identity) => {
                    println!("{}", format!("Signed in as {}", identity.display_email()).green());
                }
                _ => match usecase.cached_identity() {
                    Some(identity) => println!(
                        "{}",
                        format!("Last known identity: {}", identity.display_email()).yellow()
                    ),
                    None => println!("{}", "Not signed in".yellow()),
                },
            }
        }
        "/help" => print_help(),
        _ => println!("{}", "Unknown command, try /help".bright_black()),
    }
}

/// The main entry point for the Roster REPL application.
///
/// Sets up the capability backends (remote if configured through the
/// environment, in-memory otherwise), starts the session + live-list
/// lifecycle, and runs a rustyline REPL on top of it. Session and roster
/// changes are printed by background watcher tasks as they arrive.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // ===== Backend Initialization =====
    let (auth, store): (Arc<dyn AuthGateway>, Arc<dyn DocumentStore>) =
        match (RestAuthGateway::try_from_env(), RestDocumentStore::try_from_env()) {
            (Ok(auth), Ok(store)) => {
                println!("{}", "Using the configured remote backend.".bright_black());
                (Arc::new(auth), Arc::new(store))
            }
            _ => {
                println!(
                    "{}",
                    "No remote backend configured (ROSTER_API_KEY/ROSTER_PROJECT_ID), using the in-memory backend."
                        .bright_black()
                );
                (
                    Arc::new(MemoryAuthGateway::new()),
                    Arc::new(MemoryDocumentStore::new()),
                )
            }
        };

    let cache: Arc<dyn ProfileCache> = match TomlProfileCache::default_location() {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            println!(
                "{}",
                format!("Profile cache unavailable ({e}), falling back to in-memory.").yellow()
            );
            Arc::new(MemoryProfileCache::new())
        }
    };

    let usecase = Arc::new(RosterUseCase::new(auth, store, cache, RosterConfig::default()));

    // Optimistic identity from the cache while the first auth report resolves.
    if let Some(identity) = usecase.cached_identity() {
        println!(
            "{}",
            format!("Welcome back, {}", identity.display_email()).green()
        );
    }

    // Subscribe before starting so the first transitions are not missed
    let mut states = usecase.session_state();
    let mut records = usecase.records();

    usecase.start();

    // Spawn watcher tasks that narrate session and roster changes
    let state_watcher = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            match states.borrow_and_update().clone() {
                SessionState::Authenticated(identity) => {
                    println!(
                        "{}",
                        format!("Signed in as {}", identity.display_email()).green()
                    );
                }
                SessionState::Unauthenticated => {
                    println!("{}", "Signed out".yellow());
                }
                SessionState::Initializing => {}
            }
        }
    });

    let roster_watcher = tokio::spawn(async move {
        while records.changed().await.is_ok() {
            let list = records.borrow_and_update().clone();
            println!(
                "{}",
                format!("Roster updated ({} records)", list.len()).bright_magenta()
            );
        }
    });

    // ===== REPL Setup =====
    let helper = CliHelper::new();
    let mut rl = Editor::new()?;
    rl.set_helper(Some(helper));

    println!("{}", "=== Roster REPL ===".bright_magenta().bold());
    print_help();
    println!();

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }

                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);
                run_command(&usecase, trimmed).await;
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    // Tear down the lifecycle before exiting
    usecase.shutdown().await;
    state_watcher.abort();
    roster_watcher.abort();

    Ok(())
}

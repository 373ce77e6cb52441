//! `gatectl`: drive the session gate and locale resolver from a terminal.
//!
//! The credential lives in a JSON file (`[client] store`, default
//! `~/.mainpage/credentials.json`) under the same keys a browser would use.
//!
//! ```text
//! gatectl [--config <path>] [--locale <tag>] <command>
//!
//! Commands:
//!   login <username> --password <pw>     store a credential
//!   register <username> <email> ...      create an account
//!   whoami                               verify the stored credential
//!   play <game>                          mint a capability, print the launch URL
//!   logout                               forget the credential
//!   resolve <path> [--hint <tag>]        show the locale decision for a path
//!   switch <path> <locale>               same page in another locale
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use mainpage_gateway::config::{self, Config};
use mainpage_gateway::error::AppError;
use mainpage_gateway::locale::messages::{Catalog, Messages};
use mainpage_gateway::locale::resolve::{LocaleResolver, RouteOutcome};
use mainpage_gateway::locale::Locale;
use mainpage_gateway::logger;
use mainpage_gateway::session::gate::{FAILED_TO_START_GAME, GuardDecision, ProtectedAction};
use mainpage_gateway::session::{
    CredentialSlot, FileStore, HttpAuthBackend, RegistrationForm, SessionGate,
};

#[derive(Debug, Parser)]
#[command(name = "gatectl", version, about = "Session and locale client for the main-page gateway")]
struct Cli {
    /// Path to configuration file
    #[arg(short = 'f', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Locale to work in (default: the configured default locale)
    #[arg(short, long, global = true, env = "GATECTL_LOCALE")]
    locale: Option<String>,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the credential
    Login {
        username: String,
        #[arg(long, env = "GATECTL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account (does not log in)
    Register {
        username: String,
        email: String,
        #[arg(long, env = "GATECTL_PASSWORD", hide_env_values = true)]
        password: String,
        /// Confirmation; defaults to --password
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Verify the stored credential with the backend
    Whoami,
    /// Start a game session on an external service
    Play { game: String },
    /// Forget the stored credential
    Logout,
    /// Show how the gateway would route a path
    Resolve {
        path: String,
        #[arg(long)]
        hint: Option<String>,
    },
    /// Print the same page in another locale
    Switch { path: String, locale: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode, AppError> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref())?;
    logger::init(if cli.verbose { "debug" } else { "warn" }, cli.verbose, None)?;

    let locale = match cli.locale.as_deref() {
        Some(tag) => config
            .locales
            .set
            .get(tag)
            .cloned()
            .ok_or_else(|| AppError::Config(format!("unsupported locale '{tag}'")))?,
        None => config.locales.set.default_locale().clone(),
    };

    let resolver = LocaleResolver::new(config.locales.set.clone(), &config.excluded);

    // Pure routing commands need neither bundles nor a backend.
    match &cli.command {
        Command::Resolve { path, hint } => return Ok(resolve(&resolver, path, hint.as_deref())),
        Command::Switch { path, locale: target } => {
            let Some(target) = config.locales.set.get(target) else {
                eprintln!("unsupported locale '{target}'");
                return Ok(ExitCode::FAILURE);
            };
            println!("{}", resolver.switch_locale(path, target));
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let catalog = Catalog::load(&config.locales.messages_dir, &config.locales.set)?;
    let messages = catalog.messages(&locale)?;
    let gate = build_gate(&config)?;

    let code = match cli.command {
        Command::Login { username, password } => {
            match gate.login(&username, &password, &locale).await {
                Ok(next) => {
                    println!("{} → {next}", messages.t("login.loginSuccess"));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let text = e
                        .detail()
                        .map(String::from)
                        .or_else(|| e.message_key().map(|k| messages.t(k)))
                        .unwrap_or_else(|| e.to_string());
                    eprintln!("{text}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Register { username, email, password, confirm } => {
            let form = RegistrationForm {
                username,
                email,
                confirm_password: confirm.unwrap_or_else(|| password.clone()),
                password,
            };
            match gate.register(&form, &locale).await {
                Ok(next) => {
                    println!("{} → {next}", messages.t("register.registerSuccess"));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{}", e.message_key().map_or_else(|| e.to_string(), |k| messages.t(k)));
                    ExitCode::FAILURE
                }
            }
        }
        Command::Whoami => whoami(&gate, &messages, &locale).await,
        Command::Play { game } => play(&gate, &config, &messages, &locale, &game).await,
        Command::Logout => {
            gate.logout();
            println!("{}", messages.t("common.logout"));
            ExitCode::SUCCESS
        }
        Command::Resolve { .. } | Command::Switch { .. } => ExitCode::SUCCESS,
    };
    Ok(code)
}

fn build_gate(config: &Config) -> Result<SessionGate, AppError> {
    let store = Arc::new(FileStore::new(&config.client.store_path));
    let backend = HttpAuthBackend::new(&config.auth.api_base_url, config.auth.timeout_seconds)
        .map_err(|e| AppError::Server(e.to_string()))?;
    Ok(SessionGate::new(CredentialSlot::new(store), Arc::new(backend)))
}

fn resolve(resolver: &LocaleResolver, path: &str, hint: Option<&str>) -> ExitCode {
    match resolver.resolve(path, hint) {
        RouteOutcome::Excluded => println!("excluded {path}"),
        RouteOutcome::NotFound { segment } => {
            println!("not-found (unsupported locale '{segment}')");
            return ExitCode::FAILURE;
        }
        RouteOutcome::Localized(r) if r.redirect => {
            println!("redirect {} [{}]", r.canonical_path, r.locale);
        }
        RouteOutcome::Localized(r) => println!("serve {} [{}]", r.canonical_path, r.locale),
    }
    ExitCode::SUCCESS
}

async fn whoami(gate: &SessionGate, messages: &Messages, locale: &Locale) -> ExitCode {
    if !gate.is_authenticated() {
        println!("{}", messages.t("common.login"));
        return ExitCode::FAILURE;
    }
    let verification = gate.verify().await;
    match verification.identity {
        Some(identity) if verification.valid => {
            println!("{}", messages.t_fmt("home.welcomeUser", &[("username", identity.username.as_str())]));
            ExitCode::SUCCESS
        }
        _ => {
            println!("{} → /{locale}/login", messages.t("common.login"));
            ExitCode::FAILURE
        }
    }
}

async fn play(
    gate: &SessionGate,
    config: &Config,
    messages: &Messages,
    locale: &Locale,
    game: &str,
) -> ExitCode {
    let Some(service_url) = config.service_url(game) else {
        eprintln!("{} (no service URL configured for '{game}')", messages.t(FAILED_TO_START_GAME));
        return ExitCode::FAILURE;
    };

    match gate.guard(&ProtectedAction::start_game(game), locale).await {
        GuardDecision::Proceed(cap) => {
            println!("{}", cap.launch_url(service_url));
            ExitCode::SUCCESS
        }
        GuardDecision::Redirect(to) => {
            eprintln!("{} → {to}", messages.t("common.login"));
            ExitCode::FAILURE
        }
        GuardDecision::Failed(key) => {
            eprintln!("{}", messages.t(key));
            ExitCode::FAILURE
        }
    }
}

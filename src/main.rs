mod app;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ecogarden_accounts::{AccountError, NewUser, User, UserUpdate};
use ecogarden_advice::{AdviceUpdate, NewAdvice};
use ecogarden_core::{AppError, Config};
use serde::Serialize;

use crate::app::App;

#[derive(Parser)]
#[command(name = "ecogarden", version, about = "Gardening advice and weather lookups")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    login: Login,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load default advice and accounts into an empty database
    Seed,
    /// Current weather for a city, or for the logged-in user's home city
    Weather { city: Option<String> },
    #[command(subcommand)]
    Advice(AdviceCommand),
    #[command(subcommand)]
    User(UserCommand),
    /// Validate the configuration and print warnings
    CheckConfig,
}

#[derive(Subcommand)]
enum AdviceCommand {
    /// Advice for a month (current month by default)
    List {
        #[arg(long)]
        month: Option<i64>,
        /// List every advice regardless of month
        #[arg(long, conflicts_with = "month")]
        all: bool,
    },
    Add {
        description: String,
        #[arg(long, value_delimiter = ',', required = true)]
        months: Vec<i64>,
    },
    Update {
        id: i64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_delimiter = ',', required = true)]
        months: Vec<i64>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        city: String,
    },
    Update {
        id: i64,
        #[command(flatten)]
        changes: UserChanges,
    },
    Delete {
        id: i64,
    },
}

/// Credentials of the account running the command.
#[derive(Args)]
struct Login {
    #[arg(long = "login", global = true, env = "ECOGARDEN_LOGIN")]
    email: Option<String>,
    #[arg(
        long = "login-password",
        global = true,
        env = "ECOGARDEN_PASSWORD",
        hide_env_values = true
    )]
    password: Option<String>,
}

#[derive(Args)]
struct UserChanges {
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long)]
    city: Option<String>,
}

fn authenticate(app: &App, login: &Login) -> Result<User> {
    match (&login.email, &login.password) {
        (Some(email), Some(password)) => Ok(app.authenticate(email, password)?),
        _ => Err(AppError::from(AccountError::InvalidCredentials).into()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let (config, validation) = Config::load_validated(cli.config.as_deref())?;

    if let Command::CheckConfig = cli.command {
        println!(
            "Configuration OK ({}), {} warning(s)",
            config.config_dir.display(),
            validation.warnings.len()
        );
        return Ok(());
    }

    let app = App::new(config)?;
    tracing::debug!("Config directory: {}", app.config().config_dir.display());

    match cli.command {
        Command::CheckConfig => {}
        Command::Seed => {
            let (advice, users) = app.seed()?;
            println!("Seeded {advice} advice entries and {users} accounts");
        }
        Command::Weather { city } => {
            let caller = authenticate(&app, &cli.login)?;
            let report = match city {
                Some(city) => app.weather_for_city(&caller, &city).await?,
                None => app.weather_for_caller(&caller).await?,
            };
            print_json(&report)?;
        }
        Command::Advice(cmd) => {
            let caller = authenticate(&app, &cli.login)?;
            match cmd {
                AdviceCommand::List { month, all } => {
                    let advice = if all {
                        app.list_advice(&caller)?
                    } else {
                        app.advice_for_month(&caller, month)?
                    };
                    print_json(&advice)?;
                }
                AdviceCommand::Add {
                    description,
                    months,
                } => print_json(&app.add_advice(
                    &caller,
                    &NewAdvice {
                        description,
                        months,
                    },
                )?)?,
                AdviceCommand::Update {
                    id,
                    description,
                    months,
                } => print_json(&app.update_advice(
                    &caller,
                    id,
                    &AdviceUpdate {
                        description,
                        months,
                    },
                )?)?,
                AdviceCommand::Delete { id } => {
                    app.delete_advice(&caller, id)?;
                    println!("Deleted advice {id}");
                }
            }
        }
        Command::User(UserCommand::Register {
            email,
            password,
            city,
        }) => print_json(&app.register_user(&NewUser {
            email,
            password,
            city,
        })?)?,
        Command::User(UserCommand::Update { id, changes }) => {
            let caller = authenticate(&app, &cli.login)?;
            print_json(&app.update_user(
                &caller,
                id,
                &UserUpdate {
                    email: changes.email,
                    password: changes.password,
                    city: changes.city,
                },
            )?)?;
        }
        Command::User(UserCommand::Delete { id }) => {
            let caller = authenticate(&app, &cli.login)?;
            app.delete_user(&caller, id)?;
            println!("Deleted user {id}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = ecogarden_core::init() {
        eprintln!("{e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<AppError>() {
                Some(app_err) => {
                    tracing::error!("{} (status {})", app_err, app_err.http_status());
                    eprintln!("{}", app_err.user_message());
                }
                None => {
                    tracing::error!("{:#}", err);
                    eprintln!("{err:#}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

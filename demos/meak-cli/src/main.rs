use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use meak::prelude::*;
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "meak", about = "Meak marketplace client from the terminal")]
struct Cli {
    #[arg(long, env = "MEAK_URL", default_value = "http://127.0.0.1:54321")]
    url: String,

    #[arg(long, env = "MEAK_ANON_KEY", default_value = "")]
    anon_key: String,

    /// Where the signed-in session is kept between runs.
    #[arg(long, env = "MEAK_SESSION_FILE", default_value = ".meak/session.json")]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password.
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MEAK_PASSWORD")]
        password: String,
    },
    /// Create an account with the full profile form.
    SignUp {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "MEAK_PASSWORD")]
        password: String,
        /// International format, e.g. +212612345678.
        #[arg(long)]
        phone: String,
        #[arg(long)]
        postal_code: String,
    },
    SignOut,
    /// Send a password-recovery email.
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    /// Show the current session.
    Whoami,
    /// Show where the route guard would send you from PATH.
    Route { path: String },
    /// Update fields of your profile.
    UpdateProfile {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        postal_code: Option<String>,
    },
    /// List your bookings, or the ones assigned to you with --provider.
    Tasks {
        #[arg(long)]
        provider: bool,
    },
    /// Book a task.
    Book {
        title: String,
        #[arg(long)]
        postal_code: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },
    CancelTask { task_id: String },
    /// Search providers by first name and/or postal code.
    Search {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        postal_code: Option<String>,
    },
    /// Average rating and review count of a provider.
    Ratings { provider_id: String },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), MeakError> {
    let client = MeakClient::builder()
        .backend_config(BackendConfig {
            auto_refresh_token: false,
            ..BackendConfig::default()
        })
        .url(&cli.url)
        .anon_key(&cli.anon_key)
        .session_file(&cli.session_file)
        .build()
        .await?;
    client.start().await;
    let session = client.session();

    match cli.command {
        Command::SignIn { email, password } => {
            validate_credentials(&email, &password)?;
            session.sign_in(email.trim(), &password).await?;
            print_user(&client);
        }
        Command::SignUp {
            first_name,
            last_name,
            email,
            password,
            phone,
            postal_code,
        } => {
            let form = SignUpForm {
                first_name,
                last_name,
                email,
                password,
                phone,
                postal_code,
            };
            match session.sign_up_with_profile(&form).await? {
                SignUpOutcome::SignedIn => print_user(&client),
                SignUpOutcome::ConfirmationRequired => {
                    println!("Check your email to confirm your account, then sign in.");
                }
            }
        }
        Command::SignOut => {
            session.sign_out().await?;
            println!("Signed out.");
        }
        Command::ResetPassword { email } => {
            client.reset_password(&email).await?;
            println!("If an account exists for {email}, a reset link is on its way.");
        }
        Command::Whoami => print_user(&client),
        Command::Route { path } => {
            let location: RouteLocation = path.parse()?;
            let snapshot = session.snapshot();
            let config = client.guard_config();
            match evaluate(&snapshot, &location, config) {
                Some(target) => println!("{location} -> {}", target.path(config)),
                None => println!("{location} (allowed)"),
            }
        }
        Command::UpdateProfile {
            first_name,
            last_name,
            phone,
            postal_code,
        } => {
            let fields = UserMetadata {
                first_name,
                last_name,
                phone,
                postal_code,
                ..UserMetadata::default()
            };
            let user = signed_in_user(&client)?;
            session.update_profile(fields.clone()).await?;
            client
                .profiles()
                .upsert_profile(
                    &user.id,
                    &ProfileUpdate {
                        first_name: fields.first_name,
                        last_name: fields.last_name,
                        phone: fields.phone,
                        postal_code: fields.postal_code,
                        avatar_url: None,
                    },
                )
                .await?;
            print_user(&client);
        }
        Command::Tasks { provider } => {
            let user = signed_in_user(&client)?;
            let tasks = if provider {
                client.bookings().provider_tasks(&user.id).await?
            } else {
                client.bookings().client_tasks(&user.id).await?
            };
            print_json(&tasks);
        }
        Command::Book {
            title,
            postal_code,
            description,
            location,
        } => {
            let user = signed_in_user(&client)?;
            let task = client
                .bookings()
                .create_task(
                    &user.id,
                    &NewTask {
                        title,
                        description,
                        postal_code,
                        location,
                        scheduled_for: None,
                    },
                )
                .await?;
            print_json(&task);
        }
        Command::CancelTask { task_id } => {
            signed_in_user(&client)?;
            client.bookings().cancel_task(&task_id).await?;
            println!("Task {task_id} cancelled.");
        }
        Command::Search { query, postal_code } => {
            let providers = client
                .providers()
                .search(&ProviderSearch {
                    query,
                    postal_code,
                    category: None,
                })
                .await?;
            print_json(&providers);
        }
        Command::Ratings { provider_id } => {
            let rating = client.providers().ratings(&UserId::from(provider_id.as_str())).await?;
            match rating.average {
                Some(average) => println!("{average:.1} ({} reviews)", rating.count),
                None => println!("No reviews yet"),
            }
        }
    }

    client.shutdown();
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn signed_in_user(client: &MeakClient) -> Result<UserIdentity, MeakError> {
    client
        .session()
        .user()
        .ok_or_else(|| AuthError::Rejected("You need to sign in first".into()).into())
}

fn print_user(client: &MeakClient) {
    match client.session().user() {
        Some(user) => {
            let name = user.display_name().unwrap_or_else(|| "(no name)".into());
            println!("{name} <{}> [{}]", user.email.as_deref().unwrap_or("-"), user.id);
        }
        None => println!("Not signed in."),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::error!(error = %e, "failed to render output"),
    }
}

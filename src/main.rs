// Entrypoint for the CLI application.
// - Parses arguments, sets up logging, loads the config and builds a session.
// - Dispatches to `commands` and turns their errors into exit codes.

use clap::{Args, Parser, Subcommand};
use funix_cloud::api::RateLimiter;
use funix_cloud::commands::instance::{self, parse_env, parse_rate_limiters, DeployOptions};
use funix_cloud::commands::{settings, user};
use funix_cloud::config::Config;
use funix_cloud::render::Renderer;
use funix_cloud::ui::{Prompt, TerminalPrompt};
use funix_cloud::{CliError, Session};
use log::LevelFilter;
use std::io::{self, IsTerminal, Stdout};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "funix-cloud")]
#[command(author, version, about = "Deploy and manage apps on Funix Cloud", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.config/funix-cloud/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server URL for this run (overrides the config)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Print raw server responses
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage your account
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Deploy and manage instances
    Instance {
        #[command(subcommand)]
        action: InstanceAction,
    },

    /// Show or change client settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a new account and log in
    Register {
        username: String,
        /// Email to bind right after registering
        #[arg(long)]
        email: Option<String>,
    },
    /// Log in and save the token
    Login { username: String },
    /// Forget the saved token
    Logout,
    /// Bind an email to your account
    #[command(alias = "email")]
    Bind { email: String },
    /// Show your account profile
    Me,
    /// Bind two-factor authentication
    #[command(name = "two-fa", alias = "2fa")]
    TwoFa,
    /// Change your password
    ChangePassword,
    /// Reset a forgotten password by email
    ForgetPassword { username: String, email: String },
    /// Finish a password reset with a ticket you already have
    Ticket { ticket: String },
}

/// Parsed as one JSON value rather than repeated occurrences.
type Limiters = Vec<RateLimiter>;

#[derive(Args)]
struct DeployArgs {
    /// Name of the new instance
    name: String,

    /// Entry file to run (default: main.py, or the script itself)
    #[arg(long)]
    file: Option<String>,

    /// Disable the frontend
    #[arg(long)]
    no_frontend: bool,

    /// Use transform mode
    #[arg(long)]
    transform: bool,

    /// App secret
    #[arg(long)]
    app_secret: Option<String>,

    /// JSON list, e.g. '[{"max_calls": 10, "period": 60, "source": "browser"}]'
    #[arg(long, value_parser = parse_rate_limiters)]
    rate_limiters: Option<Limiters>,

    /// Environment variable for the app, KEY=VALUE (repeatable)
    #[arg(long = "env", value_parser = parse_env)]
    envs: Vec<(String, String)>,
}

impl From<DeployArgs> for DeployOptions {
    fn from(args: DeployArgs) -> Self {
        DeployOptions {
            name: args.name,
            file: args.file,
            no_frontend: args.no_frontend,
            transform: args.transform,
            app_secret: args.app_secret,
            rate_limiters: args.rate_limiters.unwrap_or_default(),
            envs: args.envs.into_iter().collect(),
        }
    }
}

#[derive(Subcommand)]
enum InstanceAction {
    /// List all instances
    #[command(alias = "list")]
    All,
    /// Deploy a git URL or a local path
    Deploy {
        target: String,
        #[command(flatten)]
        args: DeployArgs,
    },
    /// Deploy a git repository
    Git {
        repo: String,
        #[command(flatten)]
        args: DeployArgs,
    },
    /// Deploy a local folder, zip archive or python file
    Local {
        path: PathBuf,
        #[command(flatten)]
        args: DeployArgs,
    },
    /// Show one instance
    #[command(alias = "id")]
    Query { id: i64 },
    /// Delete an instance
    #[command(alias = "remove")]
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the current settings
    Show,
    /// Save a new server URL
    Server { url: String },
}

fn init_logging(verbose: bool) {
    let env = env_logger::Env::new().filter_or("FUNIX_CLOUD_LOG", "warn");
    let mut builder = env_logger::Builder::from_env(env);
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(Config::resolve_path(cli.config))?;
    let server = config.server_url(cli.server.as_deref());
    log::debug!("using server {server}");
    let out = Renderer::stdout().with_raw(cli.json);
    let mut s: Session<Stdout> = Session::new(config, &server, out, Box::new(TerminalPrompt))?;

    match cli.command {
        Commands::User { action } => match action {
            UserAction::Register { username, email } => {
                user::register(&mut s, &username, email.as_deref())
            }
            UserAction::Login { username } => user::login(&mut s, &username),
            UserAction::Logout => user::logout(&mut s),
            UserAction::Bind { email } => user::bind_email(&mut s, &email),
            UserAction::Me => user::me(&mut s),
            UserAction::TwoFa => user::two_fa(&mut s),
            UserAction::ChangePassword => user::change_password(&mut s),
            UserAction::ForgetPassword { username, email } => {
                user::forget_password(&mut s, &username, &email)
            }
            UserAction::Ticket { ticket } => user::reset_password(&mut s, &ticket),
        },

        Commands::Instance { action } => match action {
            InstanceAction::All => instance::list(&mut s),
            InstanceAction::Deploy { target, args } => {
                instance::deploy(&mut s, &target, &args.into())
            }
            InstanceAction::Git { repo, args } => instance::git(&mut s, &repo, &args.into()),
            InstanceAction::Local { path, args } => {
                instance::local(&mut s, &path, &args.into())
            }
            InstanceAction::Query { id } => instance::query(&mut s, id),
            InstanceAction::Delete { id } => instance::delete(&mut s, id),
        },

        Commands::Config { action } => match action {
            ConfigAction::Show => settings::show(&mut s),
            ConfigAction::Server { url } => settings::set_server(&mut s, &url),
        },
    }
}

/// Maps a failed command to an exit code. Rejections were already explained
/// by the renderer; connection problems offer the full error chain.
fn report(err: anyhow::Error) -> ExitCode {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        if !matches!(cli_err, CliError::Rejected { .. }) {
            eprintln!("{cli_err}");
        }
        return ExitCode::FAILURE;
    }

    let network = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .find(|e| e.is_connect() || e.is_timeout());
    if let Some(net) = network {
        eprintln!("Cannot reach the Funix Cloud server: {net}");
        let wants_trace = io::stdin().is_terminal()
            && TerminalPrompt
                .confirm("Print the full error trace?")
                .unwrap_or(false);
        if wants_trace {
            eprintln!("{err:?}");
        }
        return ExitCode::FAILURE;
    }

    eprintln!("Error: {err:#}");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(err),
    }
}

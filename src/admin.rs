use clap::{Parser, Subcommand};
use swgbuddy_client::admin::types::CommandLogQuery;
use swgbuddy_client::app::{self, Tracker};
use swgbuddy_client::shared::handlers::http_handler::HttpHandler;
use swgbuddy_client::shared::types::account::Role;
use swgbuddy_client::shared::util::config;
use swgbuddy_client::shared::util::store::ClientStore;
use swgbuddy_client::Result;

#[derive(Parser)]
struct Cli {
    /// Server context, defaults to the last one used
    #[arg(long, global = true)]
    server: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show who you are and your role on the server
    Me,
    /// List users with a role on the server
    Users {
        /// Filter by username
        #[arg(long)]
        filter: Option<String>,
    },
    /// Assign a role to a user
    SetRole {
        user: String,
        #[arg(value_parser = parse_role)]
        role: Role,
    },
    /// Browse the command log
    Log {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Make the backend reload its caches
    ReloadCache,
}

fn parse_role(role: &str) -> std::result::Result<Role, String> {
    role.parse()
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::get_config();
    app::init_logging(&config);

    let store = ClientStore::new(&config.store.path);
    let server_id = app::initial_server(cli.server.as_deref(), &store, &config);
    let tracker = Tracker::new(HttpHandler::new(&config.server)?, &server_id);
    tracker.refresh_session().await?;

    match &cli.command {
        Commands::Me => match tracker.session() {
            Some(session) => println!("{} ({}) is {} on `{}`",
                session.username, session.id, tracker.effective_role(), server_id),
            None => println!("Not logged in, GUEST on `{}`", server_id),
        },
        Commands::Users { filter } => {
            tracker.fetch_managed_users().await?;
            let users = match filter {
                Some(term) => tracker.filter_managed_users(term),
                None => tracker.managed_users(),
            };
            if users.is_empty() {
                println!("No users found.");
            }
            for user in users {
                println!("{:<24} {:<24} {}", user.id, user.username, user.role);
            }
        }
        Commands::SetRole { user, role } => {
            tracker.fetch_managed_users().await?;
            tracker.set_role(user, *role).await?;
            println!("Updated `{user}` to {role}");
        }
        Commands::Log { page, limit, search } => {
            let query = CommandLogQuery { page: *page, limit: *limit, search: search.clone() };
            let log = tracker.fetch_command_log(&query).await?;
            for entry in &log.logs {
                let when = chrono::DateTime::from_timestamp(entry.timestamp, 0)
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("{:<17} {:<20} {:<18} {}",
                    when, entry.username.as_deref().unwrap_or("?"), entry.command, entry.preview());
            }
            println!("page {}/{} ({} entries)", page, log.pages, log.total);
        }
        Commands::ReloadCache => {
            let response = tracker.reload_server_cache().await?;
            println!("{}", response.message.unwrap_or_else(|| "Cache reloaded".to_string()));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        println!("Error: {err}");
        std::process::exit(1);
    }
}

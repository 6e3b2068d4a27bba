//! CLI commands

use anyhow::{Result, bail};
use chrono::NaiveDateTime;
use clap::{Args, Subcommand, ValueEnum};
use dashboard_core::{FileSessionStore, Router, SessionStore};
use dashboard_http::ApiClient;
use dashboard_http::types::{ArticleInput, ArticleQuery, SearchLogic, UserInput, UserQuery};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{self, CONFIG_FILE_NAME, DashboardConfig};

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Request a password reset link
    ForgotPassword {
        #[arg(long)]
        email: String,
    },

    /// Show the signed-in admin
    Profile,

    /// Change the signed-in admin's password
    ChangePassword {
        #[arg(long = "old")]
        old_password: String,

        #[arg(long = "new")]
        new_password: String,
    },

    /// Manage articles
    Articles {
        #[command(subcommand)]
        command: ArticleCommands,
    },

    /// Manage users
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Run the navigation guard for a page
    Navigate {
        /// Target path, e.g. /articles/3/edit
        path: String,

        /// Location the navigation starts from
        #[arg(long)]
        from: Option<String>,
    },

    /// Show which session tokens are stored
    Session,

    /// Configuration files
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ArticleCommands {
    /// List articles
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Fuzzy match on the title
        #[arg(long)]
        title: Option<String>,

        /// Fuzzy match on the content
        #[arg(long)]
        content: Option<String>,

        /// Fuzzy match on the author's email
        #[arg(long)]
        author_email: Option<String>,

        #[arg(long)]
        admin_id_min: Option<u64>,

        #[arg(long)]
        admin_id_max: Option<u64>,

        #[command(flatten)]
        created: CreatedRange,
    },

    /// Show one article
    Get { id: u64 },

    /// Create an article
    Create {
        #[arg(long)]
        title: String,

        #[arg(long)]
        content: String,
    },

    /// Update an article
    Update {
        id: u64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,
    },

    /// Delete an article
    Delete { id: u64 },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List users
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Fuzzy match on the email
        #[arg(long)]
        email: Option<String>,

        #[command(flatten)]
        created: CreatedRange,
    },

    /// Show one user
    Get { id: u64 },

    /// Create a user
    Create {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Update a user
    Update {
        id: u64,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        password: Option<String>,
    },

    /// Delete a user
    Delete { id: u64 },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write the default configuration as TOML
    Init {
        /// Output file path (defaults to config.toml in the data directory)
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Paging and sorting shared by list commands
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    #[arg(long)]
    pub page: Option<u64>,

    #[arg(long)]
    pub per_page: Option<u64>,

    /// Comma-separated fields, `-` prefix for descending
    #[arg(long)]
    pub sort_by: Option<String>,

    /// How filters are combined
    #[arg(long, value_enum)]
    pub logic: Option<Logic>,
}

/// `created_at` range filter
#[derive(Args, Debug, Default)]
pub struct CreatedRange {
    /// Earliest creation time, e.g. 2024-01-31T00:00:00
    #[arg(long)]
    pub created_after: Option<NaiveDateTime>,

    /// Latest creation time
    #[arg(long)]
    pub created_before: Option<NaiveDateTime>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Logic {
    And,
    Or,
}

impl From<Logic> for SearchLogic {
    fn from(logic: Logic) -> Self {
        match logic {
            Logic::And => SearchLogic::And,
            Logic::Or => SearchLogic::Or,
        }
    }
}

/// Everything a command needs, resolved from flags and configuration
pub struct Context {
    pub config: DashboardConfig,
    pub data_dir: PathBuf,
}

/// Session store, router and client sharing one session file
struct Connection {
    store: Arc<FileSessionStore>,
    router: Arc<Router>,
    client: ApiClient,
}

impl Context {
    fn store(&self) -> Arc<FileSessionStore> {
        Arc::new(FileSessionStore::new(self.config.session_path(&self.data_dir)))
    }

    fn connect(&self) -> Result<Connection> {
        let store = self.store();
        let router = Arc::new(Router::new(store.clone()));

        let mut builder = ApiClient::builder()
            .base_url(self.config.api.base_url.clone())
            .timeout(self.config.api.timeout())
            .session_store(store.clone())
            .navigator(router.clone());
        if let Some(agent) = &self.config.api.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder.build()?;
        debug!(base_url = %client.base_url(), session = %store.path().display(), "Client ready");

        Ok(Connection {
            store,
            router,
            client,
        })
    }
}

impl Commands {
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        match self {
            Commands::Login { email, password } => {
                let conn = ctx.connect()?;
                let response = conn.client.login(&email, &password).await?;
                let navigation = conn.router.push(dashboard_core::HOME_PATH)?;
                info!(location = %navigation.location, "Logged in");
                print_json(&json!({
                    "admin": response.admin,
                    "location": navigation.location,
                }))
            }
            Commands::Logout => {
                let conn = ctx.connect()?;
                let result = conn.client.logout().await;
                print_json(&json!({
                    "location": conn.router.current()?,
                    "session": conn.store.presence()?,
                }))?;
                result?;
                Ok(())
            }
            Commands::ForgotPassword { email } => {
                let conn = ctx.connect()?;
                print_json(&conn.client.forgot_password(&email).await?)
            }
            Commands::Profile => {
                let conn = ctx.connect()?;
                print_json(&conn.client.get_profile().await?)
            }
            Commands::ChangePassword {
                old_password,
                new_password,
            } => {
                let conn = ctx.connect()?;
                print_json(
                    &conn
                        .client
                        .change_password(&old_password, &new_password)
                        .await?,
                )
            }
            Commands::Articles { command } => command.execute(&ctx.connect()?.client).await,
            Commands::Users { command } => command.execute(&ctx.connect()?.client).await,
            Commands::Navigate { path, from } => {
                let router = Router::new(ctx.store());
                let router = match from {
                    Some(from) => router.start_at(&from),
                    None => router,
                };
                print_json(&router.push(&path)?)
            }
            Commands::Session => {
                let store = ctx.store();
                let presence = store.presence()?;
                print_json(&json!({
                    "path": store.path().display().to_string(),
                    "has_access": presence.has_access,
                    "has_refresh": presence.has_refresh,
                    "authenticated": presence.is_complete(),
                }))
            }
            Commands::Config { command } => command.execute(ctx),
        }
    }
}

impl ArticleCommands {
    async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            ArticleCommands::List {
                list,
                title,
                content,
                author_email,
                admin_id_min,
                admin_id_max,
                created,
            } => {
                let query = ArticleQuery {
                    page: list.page,
                    per_page: list.per_page,
                    sort_by: list.sort_by,
                    search_logic: list.logic.map(Into::into),
                    title,
                    content,
                    author_email,
                    admin_id_min,
                    admin_id_max,
                    created_at_min: created.created_after,
                    created_at_max: created.created_before,
                };
                print_json(&client.list_articles(&query).await?)
            }
            ArticleCommands::Get { id } => print_json(&client.get_article(id).await?),
            ArticleCommands::Create { title, content } => {
                let input = ArticleInput {
                    title: Some(title),
                    content: Some(content),
                };
                print_json(&client.create_article(&input).await?)
            }
            ArticleCommands::Update { id, title, content } => {
                if title.is_none() && content.is_none() {
                    bail!("Nothing to update: pass --title and/or --content");
                }
                let input = ArticleInput { title, content };
                print_json(&client.update_article(id, &input).await?)
            }
            ArticleCommands::Delete { id } => print_json(&client.delete_article(id).await?),
        }
    }
}

impl UserCommands {
    async fn execute(self, client: &ApiClient) -> Result<()> {
        match self {
            UserCommands::List {
                list,
                email,
                created,
            } => {
                let query = UserQuery {
                    page: list.page,
                    per_page: list.per_page,
                    sort_by: list.sort_by,
                    search_logic: list.logic.map(Into::into),
                    email,
                    created_at_min: created.created_after,
                    created_at_max: created.created_before,
                };
                print_json(&client.list_users(&query).await?)
            }
            UserCommands::Get { id } => print_json(&client.get_user(id).await?),
            UserCommands::Create { email, password } => {
                let input = UserInput {
                    email: Some(email),
                    password: Some(password),
                };
                print_json(&client.create_user(&input).await?)
            }
            UserCommands::Update {
                id,
                email,
                password,
            } => {
                if email.is_none() && password.is_none() {
                    bail!("Nothing to update: pass --email and/or --password");
                }
                let input = UserInput { email, password };
                print_json(&client.update_user(id, &input).await?)
            }
            UserCommands::Delete { id } => print_json(&client.delete_user(id).await?),
        }
    }
}

impl ConfigCommands {
    fn execute(self, ctx: &Context) -> Result<()> {
        match self {
            ConfigCommands::Init { output, force } => {
                let config_path = output.unwrap_or_else(|| ctx.data_dir.join(CONFIG_FILE_NAME));
                config::generate_default_config(&config_path, force)?;
                println!(
                    "Generated dashboard configuration at: {}",
                    config_path.display()
                );
                Ok(())
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! `inkwell` server and admin binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `INKWELL_*`
//! environment variables, opens the SQLite store and either serves HTTP or
//! runs one administrative command.
//!
//! ```text
//! inkwell serve
//! echo 'hunter2' | inkwell create-user alice
//! inkwell create-group "Cats" cats --description "All about cats"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::{Parser, Subcommand};
use inkwell_core::{group::NewGroup, store::BlogStore, user::NewUser};
use inkwell_store_sqlite::SqliteStore;
use inkwell_web::{AppState, ServerConfig};
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Inkwell blogging platform")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve HTTP (the default).
  Serve,
  /// Create a user; the password is read from stdin.
  CreateUser { username: String },
  /// Create a group.
  CreateGroup {
    title: String,
    slug:  String,
    #[arg(long, default_value = "")]
    description: String,
  },
  /// Delete a group. Its posts are kept without a group.
  DeleteGroup { slug: String },
  /// Delete a user with all of their posts, comments and follows.
  DeleteUser { username: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = load_config(&cli.config)?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, server_cfg).await,
    Command::CreateUser { username } => {
      let password = rpassword_or_stdin()?;
      anyhow::ensure!(!password.is_empty(), "password must not be empty");
      let salt = SaltString::generate(&mut OsRng);
      let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
        .to_string();
      let user = store
        .add_user(NewUser { username, password_hash: Some(hash) })
        .await
        .context("failed to create user")?;
      println!("created user {} (id {})", user.username, user.user_id);
      Ok(())
    }
    Command::CreateGroup { title, slug, description } => {
      let group = store
        .add_group(NewGroup { title, slug, description })
        .await
        .context("failed to create group")?;
      println!("created group {} (/group/{}/)", group.title, group.slug);
      Ok(())
    }
    Command::DeleteGroup { slug } => {
      let group = store
        .get_group_by_slug(&slug)
        .await?
        .with_context(|| format!("no group with slug {slug:?}"))?;
      store.delete_group(group.group_id).await?;
      println!("deleted group {slug}");
      Ok(())
    }
    Command::DeleteUser { username } => {
      let user = store
        .get_user_by_username(&username)
        .await?
        .with_context(|| format!("no user named {username:?}"))?;
      store.delete_user(user.user_id).await?;
      println!("deleted user {username}");
      Ok(())
    }
  }
}

fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8000)?
    .set_default("store_path", "~/.local/share/inkwell/inkwell.db")?
    .set_default("media_root", "media")?
    .set_default("index_cache_ttl_secs", 20)?
    .set_default("max_upload_bytes", 10 * 1024 * 1024)?
    .add_source(config::File::from(path.to_path_buf()).required(false))
    .add_source(config::Environment::with_prefix("INKWELL"))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

async fn serve(store: SqliteStore, mut server_cfg: ServerConfig) -> anyhow::Result<()> {
  server_cfg.media_root = expand_tilde(&server_cfg.media_root);
  tokio::fs::create_dir_all(&server_cfg.media_root)
    .await
    .with_context(|| format!("failed to create media root {:?}", server_cfg.media_root))?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(store, server_cfg);
  let app = inkwell_web::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn rpassword_or_stdin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

//! Music release rating server.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use music_rating::api::{AppState, create_router};
use music_rating::config::{Cli, Command, ServeArgs};
use music_rating::db::{DbConfig, DbPool, NewUser, SessionRepository, UserRepository, run_migrations};
use music_rating::models::Nickname;
use music_rating::oauth::{GoogleOAuth, IdentityProvider};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn setup_database(database_url: &str) -> Result<DbPool, BoxError> {
    let config = DbConfig::new(database_url);
    let pool = config.build_pool()?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    Ok(pool)
}

fn create_user(
    pool: &DbPool,
    google_id: &str,
    email: Option<&str>,
    nickname: Option<&str>,
    admin: bool,
) -> Result<(), BoxError> {
    let repo = UserRepository::new(pool.clone());
    let nickname = nickname.map(Nickname::parse).transpose()?;

    let mut new_user = NewUser::from_google(google_id, email);
    new_user.nickname = nickname.as_ref().map(Nickname::as_str);
    new_user.is_admin = admin;

    let user = repo.create(&new_user)?;
    println!(
        "Created user '{}' (id: {}, admin: {})",
        user.nickname.as_deref().unwrap_or("<no nickname>"),
        user.id,
        user.is_admin
    );
    Ok(())
}

fn set_admin(pool: &DbPool, nickname: &str, revoke: bool) -> Result<(), BoxError> {
    let repo = UserRepository::new(pool.clone());
    let user = repo
        .find_by_nickname(nickname)?
        .ok_or_else(|| format!("User '{nickname}' not found"))?;

    let user = repo.set_admin(user.id, !revoke)?;
    println!(
        "User '{}' is {}an admin",
        nickname,
        if user.is_admin { "now " } else { "no longer " }
    );
    Ok(())
}

fn list_users(pool: &DbPool) -> Result<(), BoxError> {
    let repo = UserRepository::new(pool.clone());
    let users = repo.find_all()?;

    if users.is_empty() {
        println!("No users yet. They appear after the first Google sign-in.");
        return Ok(());
    }
    for user in users {
        println!(
            "  [{}] {} <{}>{}",
            user.id,
            user.nickname.as_deref().unwrap_or("-"),
            user.email.as_deref().unwrap_or("-"),
            if user.is_admin { " (admin)" } else { "" }
        );
    }
    Ok(())
}

fn purge_sessions(pool: &DbPool) -> Result<(), BoxError> {
    // Purging only compares expiry times, so no secret is needed.
    let repo = SessionRepository::new(pool.clone(), "", chrono::Duration::zero());
    let removed = repo.purge_expired()?;
    println!("Removed {removed} expired session(s)");
    Ok(())
}

async fn run_server(pool: DbPool, args: ServeArgs) -> Result<(), BoxError> {
    let config = args.into_config()?;

    let users = UserRepository::new(pool.clone());
    if !users.has_admins()? {
        tracing::warn!("No admin users found. Grant rights after signing in with:");
        tracing::warn!("  music-rating set-admin --nickname <nickname>");
    }

    let identity: Option<Arc<dyn IdentityProvider>> = match config.google.clone() {
        Some(google) => Some(Arc::new(GoogleOAuth::new(google)?)),
        None => {
            tracing::warn!("GOOGLE_CLIENT_ID is not set; Google sign-in is disabled");
            None
        }
    };

    let state = AppState::new(
        pool,
        &config.session_secret,
        config.session_ttl,
        config.secure_cookies,
        identity,
    );
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!("Is another process already using port {}?", config.port);
        format!("Failed to bind to {addr}: {e}")
    })?;
    tracing::info!(
        "Music rating server listening on {} (public URL {})",
        listener.local_addr()?,
        config.public_url
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "music_rating=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = match setup_database(&cli.database_url) {
        Ok(pool) => match cli.command {
            Some(Command::CreateUser {
                google_id,
                email,
                nickname,
                admin,
            }) => create_user(
                &pool,
                &google_id,
                email.as_deref(),
                nickname.as_deref(),
                admin,
            ),
            Some(Command::SetAdmin { nickname, revoke }) => set_admin(&pool, &nickname, revoke),
            Some(Command::ListUsers) => list_users(&pool),
            Some(Command::PurgeSessions) => purge_sessions(&pool),
            Some(Command::Serve) | None => run_server(pool, cli.serve).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

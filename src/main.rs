//! Arena Play demo
//!
//! Runs the session lifecycle against the built-in fixture directory:
//!
//! - first run: signs in the seeded player and stores the session token
//! - later runs: restores the stored session without asking for credentials
//! - `arena-play logout`: signs out and forgets the stored token
//!
//! Environment:
//! - `ARENA_SESSION_PATH` - session file (default `arena-session.json`)
//! - `ARENA_DIRECTORY_LATENCY_MS` - simulated directory latency (default 1000)
//! - `RUST_LOG` - log filter (default `info`)

use anyhow::{bail, Context, Result};
use app_state::SessionConfig;
use app_ui::{HomeFeed, HomeScreen, LoginScreen, TransactionFilter, WalletScreen};
use arena_client::fixtures::accounts::{RASHID_EMAIL, RASHID_PASSWORD};
use arena_client::fixtures::lobby;
use arena_client::InMemoryUserDirectory;
use arena_play::{init_tracing, App};
use std::sync::Arc;
use std::time::Duration;
use storage::FileSessionStore;

const DEFAULT_SESSION_PATH: &str = "arena-session.json";
const DEFAULT_LATENCY_MS: u64 = 1000;

fn latency_from_env() -> Result<Duration> {
    match std::env::var("ARENA_DIRECTORY_LATENCY_MS") {
        Ok(raw) => {
            let millis = raw
                .parse::<u64>()
                .with_context(|| format!("ARENA_DIRECTORY_LATENCY_MS is not a number: {raw}"))?;
            Ok(Duration::from_millis(millis))
        }
        Err(_) => Ok(Duration::from_millis(DEFAULT_LATENCY_MS)),
    }
}

fn print_signed_in(app: &App) {
    let profile = app.session.profile();
    let home = HomeScreen::for_player(profile.as_ref());
    let feed = HomeFeed::select(&lobby::games(), &lobby::tournaments(), &lobby::notifications());
    let wallet = WalletScreen::for_player(profile.as_ref())
        .with_transactions(&lobby::transactions(), TransactionFilter::All);

    println!("{}", home.greeting);
    println!("  Wallet:   {} ({})", wallet.balance, wallet.kyc_label);
    println!("  Referral: {}", home.referral_code);
    if let Some(last_login) = &wallet.last_login {
        println!("  Last login: {last_login}");
    }
    if let Some(game) = &feed.featured {
        println!("  Featured: {}", game.name);
    }
    for tournament in &feed.live_tournaments {
        println!("  Live now: {}", tournament.name);
    }
    for notification in &feed.notifications {
        println!("  New: {}", notification.title);
    }
    for row in &wallet.transactions {
        println!("  {}  {:>9}  {}", row.date, row.amount, row.description);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let session_path = std::env::var("ARENA_SESSION_PATH")
        .unwrap_or_else(|_| DEFAULT_SESSION_PATH.to_string());
    let directory = InMemoryUserDirectory::with_fixture_accounts().with_latency(latency_from_env()?);

    // The fixture directory forgets issued tokens between runs, so seed the
    // stored one back in before the startup check.
    let store = Arc::new(FileSessionStore::at(&session_path));
    let directory = Arc::new(directory);
    if let Ok(Some(stored)) = storage::SessionStore::load(store.as_ref()).await {
        directory.adopt_session(&stored.user_id, &stored.token, stored.expires_at);
    }

    let app = App::new(directory, store, SessionConfig::default());
    let route = app.start().await;
    tracing::info!(route = route.title(), "startup resolved");

    match std::env::args().nth(1).as_deref() {
        Some("logout") => {
            app.auth.logout().await;
            println!("Signed out; now on {}", app.router.current_route().title());
        }
        Some(other) => bail!("unknown command: {other}"),
        None if app.session.is_authenticated() => print_signed_in(&app),
        None => {
            let mut login = LoginScreen::new(app.auth.clone());
            login.set_email(RASHID_EMAIL);
            login.set_password(RASHID_PASSWORD);
            if !login.submit().await {
                bail!("sign in failed: {:?}", login.errors());
            }
            print_signed_in(&app);
        }
    }

    Ok(())
}

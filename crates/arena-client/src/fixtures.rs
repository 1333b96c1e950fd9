//! In-memory directory backed by fixture accounts
//!
//! This is the directory the app runs against until the backend is wired
//! in, and the one every test uses. It behaves like the real service: it
//! checks passwords, refuses duplicate emails, issues expiring tokens and
//! can simulate network latency.

use crate::catalog::{
    Game, GameStatus, GameType, Notification, NotificationType, Tournament, TournamentStatus,
    Transaction, TransactionStatus, TransactionType,
};
use crate::directory::{DirectoryError, Result, UserDirectory};
use crate::profile::{AuthGrant, NewAccount, SessionToken, UserProfile};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::time::Duration as StdDuration;

fn timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Fixture accounts
pub mod accounts {
    use super::*;

    /// Email of the seeded player
    pub const RASHID_EMAIL: &str = "rashid.k@example.com";

    /// Password of the seeded player
    pub const RASHID_PASSWORD: &str = "validpass";

    /// The seeded player, Rashid Khan from Maharashtra
    pub fn rashid() -> UserProfile {
        let mut profile = UserProfile::new("user123", "rashid89", RASHID_EMAIL);
        profile.display_name = "Rashid Khan".to_string();
        profile.phone = "+91 9876543210".to_string();
        profile.avatar =
            "https://images.pexels.com/photos/2379005/pexels-photo-2379005.jpeg".to_string();
        profile.kyc_verified = true;
        profile.wallet_balance = 2500;
        profile.created_at = timestamp("2023-05-10T14:30:00Z");
        profile.last_login = timestamp("2023-06-15T09:45:00Z");
        profile.referral_code = "RASHID500".to_string();
        profile.state = "Maharashtra".to_string();
        profile
    }
}

/// Fixture lobby: games, tournaments, the seeded player's wallet history
/// and notifications
pub mod lobby {
    use super::*;

    fn game(id: &str, name: &str, game_type: GameType, min_entry_fee: u64, status: GameStatus) -> Game {
        Game {
            id: id.to_string(),
            name: name.to_string(),
            game_type,
            description: format!("Play {name} with players across India"),
            image: format!("https://images.arenaplay.in/games/{id}.jpeg"),
            min_players: 2,
            max_players: if game_type == GameType::Poker { 9 } else { 6 },
            min_entry_fee,
            is_active: true,
            status,
        }
    }

    /// Games in lobby order
    pub fn games() -> Vec<Game> {
        vec![
            game("game1", "Texas Hold'em", GameType::Poker, 10, GameStatus::Featured),
            game("game2", "Indian Rummy", GameType::Rummy, 5, GameStatus::Popular),
            game("game3", "Ludo King", GameType::Ludo, 5, GameStatus::Popular),
            game("game4", "Omaha Poker", GameType::Poker, 20, GameStatus::Popular),
            game("game5", "Fantasy Cricket", GameType::Fantasy, 25, GameStatus::New),
            game("game6", "Points Rummy", GameType::Rummy, 2, GameStatus::New),
            game("game7", "Snakes and Ladders", GameType::Other, 1, GameStatus::Regular),
        ]
    }

    fn tournament(
        id: &str,
        game_id: &str,
        name: &str,
        start: &str,
        (entry_fee, prize_pool): (u64, u64),
        status: TournamentStatus,
    ) -> Tournament {
        Tournament {
            id: id.to_string(),
            game_id: game_id.to_string(),
            name: name.to_string(),
            description: format!("{name}: top ten places share the prize pool"),
            start_time: timestamp(start),
            entry_fee,
            prize_pool,
            max_players: 100,
            registered_players: 64,
            status,
        }
    }

    /// Tournaments in schedule order
    pub fn tournaments() -> Vec<Tournament> {
        vec![
            tournament("tour1", "game1", "Sunday Poker Showdown", "2023-06-18T14:00:00Z", (500, 50_000), TournamentStatus::Live),
            tournament("tour2", "game2", "Rummy Royale", "2023-06-20T16:00:00Z", (100, 10_000), TournamentStatus::Upcoming),
            tournament("tour3", "game5", "IPL Fantasy Cup", "2023-06-22T13:30:00Z", (50, 25_000), TournamentStatus::Upcoming),
            tournament("tour4", "game3", "Ludo Masters", "2023-06-25T11:00:00Z", (20, 2_000), TournamentStatus::Upcoming),
            tournament("tour5", "game4", "Omaha Night", "2023-06-10T19:00:00Z", (200, 20_000), TournamentStatus::Completed),
        ]
    }

    fn transaction(id: &str, amount: u64, kind: TransactionType, at: &str, description: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            user_id: "user123".to_string(),
            amount,
            kind,
            status: TransactionStatus::Completed,
            created_at: timestamp(at),
            updated_at: timestamp(at),
            reference_id: format!("ref_{id}"),
            description: description.to_string(),
        }
    }

    /// The seeded player's wallet history, newest first
    pub fn transactions() -> Vec<Transaction> {
        vec![
            transaction("txn1", 1000, TransactionType::Deposit, "2023-06-15T10:30:00Z", "Added via UPI"),
            transaction("txn2", 500, TransactionType::EntryFee, "2023-06-14T18:00:00Z", "Sunday Poker Showdown entry"),
            transaction("txn3", 1200, TransactionType::Winnings, "2023-06-12T21:15:00Z", "Rummy Royale prize"),
            transaction("txn4", 800, TransactionType::Withdrawal, "2023-06-11T09:00:00Z", "Bank transfer"),
            transaction("txn5", 100, TransactionType::Bonus, "2023-06-10T12:00:00Z", "Referral bonus"),
            transaction("txn6", 200, TransactionType::Refund, "2023-06-09T08:45:00Z", "Omaha Night cancelled table"),
        ]
    }

    fn notification(id: &str, title: &str, kind: NotificationType, is_read: bool, at: &str) -> Notification {
        Notification {
            id: id.to_string(),
            user_id: "user123".to_string(),
            title: title.to_string(),
            message: format!("{title}. Tap to see details."),
            kind,
            is_read,
            created_at: timestamp(at),
        }
    }

    /// The seeded player's notifications, newest first
    pub fn notifications() -> Vec<Notification> {
        vec![
            notification("notif1", "Deposit successful", NotificationType::Deposit, false, "2023-06-15T10:31:00Z"),
            notification("notif2", "Sunday Poker Showdown is live", NotificationType::Game, false, "2023-06-15T09:00:00Z"),
            notification("notif3", "Weekend cashback", NotificationType::Promo, true, "2023-06-14T08:00:00Z"),
            notification("notif4", "Withdrawal processed", NotificationType::Withdrawal, false, "2023-06-11T09:05:00Z"),
            notification("notif5", "New tables for Points Rummy", NotificationType::General, false, "2023-06-10T07:30:00Z"),
        ]
    }
}

/// Number of calls received per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryCalls {
    /// `validate_credentials` calls
    pub validate: usize,
    /// `register` calls
    pub register: usize,
    /// `resume_session` calls
    pub resume: usize,
    /// `end_session` calls
    pub end: usize,
}

impl DirectoryCalls {
    /// Sum of all calls
    pub fn total(&self) -> usize {
        self.validate + self.register + self.resume + self.end
    }
}

struct StoredAccount {
    password: String,
    profile: UserProfile,
}

/// Directory that keeps accounts and sessions in memory
pub struct InMemoryUserDirectory {
    /// Accounts keyed by normalized email
    accounts: RwLock<HashMap<String, StoredAccount>>,
    /// Open sessions: token value -> (normalized email, token)
    sessions: RwLock<HashMap<String, (String, SessionToken)>>,
    /// Profile that new registrations are built from
    template: UserProfile,
    latency: StdDuration,
    token_ttl: Duration,
    calls: Mutex<DirectoryCalls>,
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::with_fixture_accounts()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl InMemoryUserDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            template: accounts::rashid(),
            latency: StdDuration::ZERO,
            token_ttl: Duration::days(30),
            calls: Mutex::new(DirectoryCalls::default()),
        }
    }

    /// Create a directory seeded with the fixture player
    pub fn with_fixture_accounts() -> Self {
        let directory = Self::new();
        directory.add_account(accounts::rashid(), accounts::RASHID_PASSWORD);
        directory
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: StdDuration) -> Self {
        self.latency = latency;
        self
    }

    /// Lifetime of issued tokens
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Profile whose fields new registrations inherit
    pub fn with_template(mut self, template: UserProfile) -> Self {
        self.template = template;
        self
    }

    /// Seed an account
    pub fn add_account(&self, profile: UserProfile, password: impl Into<String>) {
        self.accounts.write().insert(
            normalize_email(&profile.email),
            StoredAccount { password: password.into(), profile },
        );
    }

    /// Calls received so far
    pub fn calls(&self) -> DirectoryCalls {
        *self.calls.lock()
    }

    /// Number of open sessions
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Drop every open session, as a backend-side logout would
    pub fn revoke_all_sessions(&self) {
        self.sessions.write().clear();
    }

    /// Accept a token issued by an earlier instance for the account `user_id`
    ///
    /// Returns false when no account has that id.
    pub fn adopt_session(&self, user_id: &str, token: &str, expires_at: DateTime<Utc>) -> bool {
        let email_key = self
            .accounts
            .read()
            .iter()
            .find(|(_, account)| account.profile.id() == user_id)
            .map(|(key, _)| key.clone());

        match email_key {
            Some(key) => {
                self.sessions
                    .write()
                    .insert(token.to_string(), (key, SessionToken::new(token, expires_at)));
                true
            }
            None => false,
        }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn open_session(&self, email_key: String, profile: UserProfile) -> AuthGrant {
        let token = SessionToken::issue(uuid::Uuid::new_v4().simple().to_string(), self.token_ttl);

        let mut sessions = self.sessions.write();
        let now = Utc::now();
        sessions.retain(|_, (_, issued)| !issued.is_expired_at(now));
        sessions.insert(token.as_str().to_string(), (email_key, token.clone()));

        AuthGrant { profile, token }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn validate_credentials(&self, email: &str, password: &str) -> Result<AuthGrant> {
        self.calls.lock().validate += 1;
        self.simulate_latency().await;

        let key = normalize_email(email);
        let profile = {
            let mut accounts = self.accounts.write();
            let account = accounts
                .get_mut(&key)
                .filter(|account| account.password == password)
                .ok_or(DirectoryError::InvalidCredentials)?;
            account.profile.last_login = Utc::now();
            account.profile.clone()
        };

        tracing::debug!(user_id = profile.id(), "fixture directory accepted credentials");
        Ok(self.open_session(key, profile))
    }

    async fn register(&self, account: &NewAccount) -> Result<AuthGrant> {
        self.calls.lock().register += 1;
        self.simulate_latency().await;

        let key = normalize_email(&account.email);
        let profile = {
            let mut accounts = self.accounts.write();
            if accounts.contains_key(&key) {
                return Err(DirectoryError::AccountExists(account.email.clone()));
            }

            let now = Utc::now();
            let mut profile = self.template.reassigned(uuid::Uuid::new_v4().to_string());
            profile.email = account.email.clone();
            profile.username = account.username.clone();
            if let Some(phone) = &account.phone {
                profile.phone = phone.clone();
            }
            if let Some(state) = &account.state {
                profile.state = state.clone();
            }
            profile.created_at = now;
            profile.last_login = now;

            accounts.insert(
                key.clone(),
                StoredAccount { password: account.password.clone(), profile: profile.clone() },
            );
            profile
        };

        tracing::debug!(user_id = profile.id(), "fixture directory registered account");
        Ok(self.open_session(key, profile))
    }

    async fn resume_session(&self, token: &SessionToken) -> Result<UserProfile> {
        self.calls.lock().resume += 1;
        self.simulate_latency().await;

        let email_key = {
            let mut sessions = self.sessions.write();
            let (email_key, issued) = sessions
                .get(token.as_str())
                .cloned()
                .ok_or(DirectoryError::SessionExpired)?;
            if issued.is_expired() || token.is_expired() {
                sessions.remove(token.as_str());
                return Err(DirectoryError::SessionExpired);
            }
            email_key
        };

        let accounts = self.accounts.read();
        accounts
            .get(&email_key)
            .map(|account| account.profile.clone())
            .ok_or(DirectoryError::SessionExpired)
    }

    async fn end_session(&self, token: &SessionToken) -> Result<()> {
        self.calls.lock().end += 1;
        self.simulate_latency().await;

        if self.sessions.write().remove(token.as_str()).is_some() {
            tracing::debug!("fixture directory ended session");
        }
        Ok(())
    }
}

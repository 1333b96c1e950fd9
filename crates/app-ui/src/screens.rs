//! Screen models
//!
//! Each model holds what its screen renders and reacts to input. Views bind
//! to these; none of them touch session state directly.

use crate::navigation::Route;
use app_core::validation::{Field, FieldErrors, LoginForm, RegistrationForm};
use app_core::AuthService;
use arena_client::{
    Game, GameStatus, Notification, Tournament, TournamentStatus, Transaction, TransactionType,
    UserProfile,
};
use chrono::{DateTime, Utc};

/// Greeting name used when the player has no display name
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Referral code shown when the profile has none
pub const DEFAULT_REFERRAL_CODE: &str = "FRIEND500";

/// Format an amount in rupees with Indian digit grouping
///
/// The last three digits form one group, every group before that has two:
/// `2500` is `₹2,500`, `1234567` is `₹12,34,567`.
pub fn format_rupees(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return format!("₹{digits}");
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 2 + 4);
    grouped.push('₹');
    for (i, ch) in head.chars().enumerate() {
        if i > 0 && (head.len() - i) % 2 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped.push(',');
    grouped.push_str(tail);
    grouped
}

/// Format a transaction amount with its direction, e.g. `+₹1,000` for a
/// deposit and `-₹500` for an entry fee
///
/// Only deposits, winnings and bonuses count as money in.
pub fn format_signed_amount(amount: u64, kind: TransactionType) -> String {
    let sign = if kind.is_credit() { '+' } else { '-' };
    format!("{sign}{}", format_rupees(amount))
}

/// Format a date the way the wallet shows it, e.g. `15 Jun 2023`
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%d %b %Y").to_string()
}

// =============================================================================
// Login
// =============================================================================

/// Login screen
pub struct LoginScreen {
    auth: AuthService,
    form: LoginForm,
    errors: FieldErrors,
}

impl LoginScreen {
    /// Create an empty login screen
    pub fn new(auth: AuthService) -> Self {
        Self { auth, form: LoginForm::default(), errors: FieldErrors::new() }
    }

    /// Values typed so far
    pub fn form(&self) -> &LoginForm {
        &self.form
    }

    /// Messages from the last submission
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Email input changed
    pub fn set_email(&mut self, email: impl Into<String>) {
        self.form.email = email.into();
    }

    /// Password input changed
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.form.password = password.into();
    }

    /// Whether the submit button shows a spinner
    pub fn is_submitting(&self) -> bool {
        self.auth.session().is_loading()
    }

    /// Whether the submit button is enabled
    pub fn can_submit(&self) -> bool {
        !self.is_submitting()
    }

    /// Validate and sign in; returns whether the player is now signed in
    ///
    /// Navigation on success is done by the session manager.
    pub async fn submit(&mut self) -> bool {
        if !self.can_submit() {
            return false;
        }

        match self.auth.login(&self.form).await {
            Ok(_) => {
                self.errors.clear_all();
                true
            }
            Err(errors) => {
                self.errors = errors;
                false
            }
        }
    }

    /// Target of the "Sign up" link
    pub fn register_route(&self) -> Route {
        Route::Register
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Registration progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterStep {
    /// Username, email and password
    Account,
    /// Phone and state
    Contact,
}

/// Two-step registration screen
pub struct RegisterScreen {
    auth: AuthService,
    form: RegistrationForm,
    step: RegisterStep,
    errors: FieldErrors,
}

impl RegisterScreen {
    /// Create an empty registration screen on the first step
    pub fn new(auth: AuthService) -> Self {
        Self {
            auth,
            form: RegistrationForm::default(),
            step: RegisterStep::Account,
            errors: FieldErrors::new(),
        }
    }

    /// Current step
    pub fn step(&self) -> RegisterStep {
        self.step
    }

    /// Values typed so far
    pub fn form(&self) -> &RegistrationForm {
        &self.form
    }

    /// Messages to show
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Update one input; its error goes away while the player types
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        let slot = match field {
            Field::Username => &mut self.form.username,
            Field::Email => &mut self.form.email,
            Field::Password => &mut self.form.password,
            Field::ConfirmPassword => &mut self.form.confirm_password,
            Field::Phone => &mut self.form.phone,
            Field::State => &mut self.form.state,
        };
        *slot = value;
        self.errors.clear(field);
    }

    /// Whether the submit button shows a spinner
    pub fn is_submitting(&self) -> bool {
        self.auth.session().is_loading()
    }

    /// "Next" on the first step; returns whether the second step is shown
    pub fn next(&mut self) -> bool {
        if self.step != RegisterStep::Account {
            return false;
        }

        match self.form.validate_account_step() {
            Ok(()) => {
                self.errors.clear_all();
                self.step = RegisterStep::Contact;
                true
            }
            Err(errors) => {
                self.errors = errors;
                false
            }
        }
    }

    /// "Back" on the second step
    pub fn back(&mut self) -> bool {
        if self.step == RegisterStep::Contact {
            self.step = RegisterStep::Account;
            true
        } else {
            false
        }
    }

    /// "Create Account" on the second step; returns whether the player is
    /// now signed in
    pub async fn submit(&mut self) -> bool {
        if self.step != RegisterStep::Contact || self.is_submitting() {
            return false;
        }

        if let Err(errors) = self.form.validate_contact_step() {
            self.errors = errors;
            return false;
        }

        match self.auth.register(&self.form).await {
            Ok(_) => {
                self.errors.clear_all();
                true
            }
            Err(errors) => {
                self.errors = errors;
                false
            }
        }
    }

    /// Target of the "Sign in" link
    pub fn login_route(&self) -> Route {
        Route::Login
    }
}

// =============================================================================
// Signed-in tabs
// =============================================================================

/// Popular games shown on the home tab
pub const POPULAR_GAME_LIMIT: usize = 2;

/// Upcoming tournaments shown on the home tab
pub const UPCOMING_TOURNAMENT_LIMIT: usize = 2;

/// Unread notifications shown on the home tab
pub const NOTIFICATION_LIMIT: usize = 3;

/// What the home tab header shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeScreen {
    /// `Hey, {first name}`
    pub greeting: String,
    /// Wallet balance in rupees
    pub wallet_balance: String,
    /// Code shown in the referral card
    pub referral_code: String,
}

impl HomeScreen {
    /// Build the header for the current player
    pub fn for_player(profile: Option<&UserProfile>) -> Self {
        let name = profile
            .and_then(UserProfile::first_name)
            .unwrap_or(DEFAULT_PLAYER_NAME);
        let referral_code = profile
            .map(|p| p.referral_code.as_str())
            .filter(|code| !code.is_empty())
            .unwrap_or(DEFAULT_REFERRAL_CODE);

        Self {
            greeting: format!("Hey, {name}"),
            wallet_balance: format_rupees(profile.map_or(0, |p| p.wallet_balance)),
            referral_code: referral_code.to_string(),
        }
    }
}

/// The lists under the home tab header, picked from what the lobby
/// returned
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HomeFeed {
    /// Banner game: the first featured one
    pub featured: Option<Game>,
    /// First popular games
    pub popular: Vec<Game>,
    /// Every new game
    pub new_games: Vec<Game>,
    /// Every tournament in progress
    pub live_tournaments: Vec<Tournament>,
    /// Next tournaments open for registration
    pub upcoming_tournaments: Vec<Tournament>,
    /// Latest unread notifications
    pub notifications: Vec<Notification>,
}

impl HomeFeed {
    /// Pick the home lists, keeping the order they were given in
    pub fn select(games: &[Game], tournaments: &[Tournament], notifications: &[Notification]) -> Self {
        let games_with = |status: GameStatus| games.iter().filter(move |g| g.status == status).cloned();
        let tournaments_with =
            |status: TournamentStatus| tournaments.iter().filter(move |t| t.status == status).cloned();

        Self {
            featured: games_with(GameStatus::Featured).next(),
            popular: games_with(GameStatus::Popular).take(POPULAR_GAME_LIMIT).collect(),
            new_games: games_with(GameStatus::New).collect(),
            live_tournaments: tournaments_with(TournamentStatus::Live).collect(),
            upcoming_tournaments: tournaments_with(TournamentStatus::Upcoming)
                .take(UPCOMING_TOURNAMENT_LIMIT)
                .collect(),
            notifications: notifications
                .iter()
                .filter(|n| !n.is_read)
                .take(NOTIFICATION_LIMIT)
                .cloned()
                .collect(),
        }
    }
}

/// Wallet history tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionFilter {
    /// Everything, refunds included
    #[default]
    All,
    /// Deposits, winnings and bonuses
    Deposits,
    /// Withdrawals and entry fees
    Withdrawals,
}

impl TransactionFilter {
    /// Whether a transaction of this type is listed under the tab
    pub fn matches(self, kind: TransactionType) -> bool {
        match self {
            TransactionFilter::All => true,
            TransactionFilter::Deposits => kind.is_credit(),
            TransactionFilter::Withdrawals => kind.is_debit(),
        }
    }
}

/// One line of the wallet history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRow {
    /// Transaction identifier, for the detail screen
    pub id: String,
    /// What the transaction was
    pub description: String,
    /// Signed amount, e.g. `+₹1,000`
    pub amount: String,
    /// Whether money came in; drives the amount colour
    pub is_credit: bool,
    /// Creation date, e.g. `15 Jun 2023`
    pub date: String,
}

impl TransactionRow {
    fn from_transaction(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id.clone(),
            description: transaction.description.clone(),
            amount: format_signed_amount(transaction.amount, transaction.kind),
            is_credit: transaction.kind.is_credit(),
            date: format_date(transaction.created_at),
        }
    }
}

/// What the wallet tab shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletScreen {
    /// Wallet balance in rupees
    pub balance: String,
    /// Whether identity checks are complete
    pub kyc_verified: bool,
    /// Badge text for the KYC state
    pub kyc_label: &'static str,
    /// Last sign-in date, when known
    pub last_login: Option<String>,
    /// Selected history tab
    pub filter: TransactionFilter,
    /// History lines under the selected tab
    pub transactions: Vec<TransactionRow>,
}

impl WalletScreen {
    /// Build the summary for the current player, with an empty history
    pub fn for_player(profile: Option<&UserProfile>) -> Self {
        let kyc_verified = profile.is_some_and(|p| p.kyc_verified);
        Self {
            balance: format_rupees(profile.map_or(0, |p| p.wallet_balance)),
            kyc_verified,
            kyc_label: if kyc_verified { "KYC Verified" } else { "KYC Pending" },
            last_login: profile.map(|p| format_date(p.last_login)),
            filter: TransactionFilter::default(),
            transactions: Vec::new(),
        }
    }

    /// List the history under `filter`
    pub fn with_transactions(mut self, history: &[Transaction], filter: TransactionFilter) -> Self {
        self.filter = filter;
        self.transactions = history
            .iter()
            .filter(|t| filter.matches(t.kind))
            .map(TransactionRow::from_transaction)
            .collect();
        self
    }
}

//! Games, tournaments, wallet transactions and notifications
//!
//! Read-only records the backend lists for the signed-in tabs. Field names
//! follow the backend's camelCase JSON; enum values are lowercase strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    /// Poker variants
    Poker,
    /// Indian rummy
    Rummy,
    /// Ludo
    Ludo,
    /// Fantasy sports
    Fantasy,
    /// Anything else
    Other,
}

/// How the lobby promotes a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Shown in the popular row
    Popular,
    /// Recently added
    New,
    /// The home banner game
    Featured,
    /// Listed without promotion
    Regular,
}

/// A game in the lobby
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Backend identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Kind of game
    #[serde(rename = "type")]
    pub game_type: GameType,
    /// Lobby blurb
    pub description: String,
    /// Card artwork
    #[serde(rename = "imageUrl")]
    pub image: String,
    /// Smallest table
    pub min_players: u32,
    /// Largest table
    pub max_players: u32,
    /// Cheapest table, in rupees
    pub min_entry_fee: u64,
    /// Whether tables are open
    pub is_active: bool,
    /// Lobby promotion
    pub status: GameStatus,
}

/// Where a tournament is in its schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    /// Registration open
    Upcoming,
    /// In progress
    Live,
    /// Finished
    Completed,
}

/// A scheduled tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    /// Backend identifier
    pub id: String,
    /// Game the tournament is played in
    pub game_id: String,
    /// Display name
    pub name: String,
    /// Rules and prizes
    pub description: String,
    /// Scheduled start
    pub start_time: DateTime<Utc>,
    /// Entry fee in rupees
    pub entry_fee: u64,
    /// Prize pool in rupees
    pub prize_pool: u64,
    /// Seat limit
    pub max_players: u32,
    /// Seats taken
    pub registered_players: u32,
    /// Schedule state
    pub status: TournamentStatus,
}

impl Tournament {
    /// Seats still open
    pub fn seats_left(&self) -> u32 {
        self.max_players.saturating_sub(self.registered_players)
    }
}

/// What moved money in or out of the wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money added by the player
    Deposit,
    /// Money paid out to the player
    Withdrawal,
    /// Prize credited
    Winnings,
    /// Tournament or table entry
    EntryFee,
    /// Promotional credit
    Bonus,
    /// Entry returned
    Refund,
}

impl TransactionType {
    /// Money added to the wallet
    pub fn is_credit(self) -> bool {
        matches!(self, Self::Deposit | Self::Winnings | Self::Bonus)
    }

    /// Money taken out of the wallet
    pub fn is_debit(self) -> bool {
        matches!(self, Self::Withdrawal | Self::EntryFee)
    }
}

/// Settlement state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Not settled yet
    Pending,
    /// Settled
    Completed,
    /// Rejected or reversed
    Failed,
}

/// A wallet transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Backend identifier
    pub id: String,
    /// Owner of the wallet
    pub user_id: String,
    /// Rupees; the type says which way it went
    pub amount: u64,
    /// What moved the money
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Settlement state
    pub status: TransactionStatus,
    /// When it was created
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
    /// Payment or tournament reference
    pub reference_id: String,
    /// Line shown in the wallet list
    pub description: String,
}

/// Topic of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// Announcements
    General,
    /// Deposit receipts
    Deposit,
    /// Withdrawal updates
    Withdrawal,
    /// Game and tournament news
    Game,
    /// Offers
    Promo,
    /// Support ticket replies
    Support,
}

/// A message for the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Backend identifier
    pub id: String,
    /// Recipient
    pub user_id: String,
    /// Headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Topic
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Whether the player has opened it
    pub is_read: bool,
    /// When it was sent
    pub created_at: DateTime<Utc>,
}

//! # Chat Platform Boundary
//!
//! Everything the command layer needs from the chat service: replying,
//! permission lookups and guild mutations. The Discord implementation lives in
//! [`crate::discord`]; tests use an in-memory fake.

use serenity::async_trait;
use std::path::Path;
use thiserror::Error;

/// Where a command came from and where replies go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub channel_id: u64,
    pub guild_id: Option<u64>,
    pub message_id: u64,
}

impl Origin {
    pub fn is_direct_message(&self) -> bool {
        self.guild_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    pub user_id: u64,
    pub name: String,
    pub is_bot: bool,
}

impl Invoker {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

/// A message delivered by the gateway.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub author: Invoker,
    pub content: String,
    pub origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub user_id: u64,
    pub display_name: String,
    /// Unix seconds.
    pub joined_at: Option<i64>,
    pub role_ids: Vec<u64>,
}

impl MemberInfo {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInfo {
    pub id: u64,
    pub name: String,
    pub position: i64,
}

impl RoleInfo {
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Administrator,
    KickMembers,
    BanMembers,
    ManageMessages,
    ManageRoles,
}

impl Capability {
    pub fn describe(&self) -> &'static str {
        match self {
            Capability::Administrator => "administrator",
            Capability::KickMembers => "kick members",
            Capability::BanMembers => "ban members",
            Capability::ManageMessages => "manage messages",
            Capability::ManageRoles => "manage roles",
        }
    }
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Other(String),
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn send_message(&self, origin: &Origin, content: &str) -> PlatformResult<()>;

    async fn send_file(&self, origin: &Origin, path: &Path, caption: &str) -> PlatformResult<()>;

    async fn has_capability(
        &self,
        guild_id: u64,
        user_id: u64,
        capability: Capability,
    ) -> PlatformResult<bool>;

    async fn member(&self, guild_id: u64, user_id: u64) -> PlatformResult<Option<MemberInfo>>;

    async fn find_member_by_name(&self, guild_id: u64, name: &str) -> PlatformResult<Option<MemberInfo>>;

    async fn roles(&self, guild_id: u64) -> PlatformResult<Vec<RoleInfo>>;

    async fn kick(&self, guild_id: u64, user_id: u64, reason: &str) -> PlatformResult<()>;

    async fn ban(&self, guild_id: u64, user_id: u64, reason: &str) -> PlatformResult<()>;

    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> PlatformResult<()>;

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> PlatformResult<()>;

    /// Delete the `count` messages before the command message, plus the
    /// command message itself. Returns how many of the earlier messages went.
    async fn purge(&self, origin: &Origin, count: u64) -> PlatformResult<usize>;
}

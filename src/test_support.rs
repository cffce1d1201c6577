//! In-memory [`ChatPlatform`] used by the command tests.

use crate::config::Config;
use crate::platform::{
    Capability, ChatPlatform, IncomingMessage, Invoker, MemberInfo, Origin, PlatformError,
    PlatformResult, RoleInfo,
};
use crate::state::BotState;
use serenity::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub const GUILD: u64 = 1000;
pub const CHANNEL: u64 = 2000;
pub const ADMIN: u64 = 1;
pub const MODERATOR: u64 = 2;
pub const MEMBER: u64 = 3;
pub const TARGET: u64 = 4;
pub const MUTED_ROLE: u64 = 500;
pub const HELPER_ROLE: u64 = 501;
pub const VIP_ROLE: u64 = 502;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Kick { user_id: u64, reason: String },
    Ban { user_id: u64, reason: String },
    AddRole { user_id: u64, role_id: u64 },
    RemoveRole { user_id: u64, role_id: u64 },
    Purge { count: u64 },
}

#[derive(Default)]
pub struct FakePlatform {
    pub sent: Mutex<Vec<(u64, String)>>,
    pub files: Mutex<Vec<PathBuf>>,
    pub actions: Mutex<Vec<Action>>,
    pub admins: HashSet<u64>,
    pub grants: HashMap<u64, HashSet<Capability>>,
    pub members: Vec<MemberInfo>,
    pub roles: Mutex<Vec<RoleInfo>>,
    /// Simulates the bot's role sitting too low for mutations.
    pub forbid_mutations: AtomicBool,
}

impl FakePlatform {
    /// A guild with an admin, a moderator holding every moderation
    /// capability, a plain member and a target to act on.
    pub fn guild() -> Self {
        let moderator_grants: HashSet<Capability> = [
            Capability::KickMembers,
            Capability::BanMembers,
            Capability::ManageMessages,
            Capability::ManageRoles,
        ]
        .into_iter()
        .collect();

        let member = |user_id: u64, name: &str, role_ids: Vec<u64>| MemberInfo {
            user_id,
            display_name: name.to_string(),
            joined_at: Some(1_700_000_000),
            role_ids,
        };

        let role = |id: u64, name: &str, position: i64| RoleInfo {
            id,
            name: name.to_string(),
            position,
        };

        FakePlatform {
            admins: [ADMIN].into_iter().collect(),
            grants: [(MODERATOR, moderator_grants)].into_iter().collect(),
            members: vec![
                member(ADMIN, "boss", vec![]),
                member(MODERATOR, "mod", vec![HELPER_ROLE]),
                member(MEMBER, "pleb", vec![]),
                member(TARGET, "troll", vec![HELPER_ROLE, VIP_ROLE]),
            ],
            roles: Mutex::new(vec![
                role(GUILD, "@everyone", 0),
                role(MUTED_ROLE, "Muted", 1),
                role(HELPER_ROLE, "Helper", 2),
                role(VIP_ROLE, "VIP", 5),
            ]),
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn last_message(&self) -> String {
        self.messages().last().cloned().unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn set_forbidden(&self, forbidden: bool) {
        self.forbid_mutations.store(forbidden, Ordering::SeqCst);
    }

    /// Delete a role from the guild, as an admin might mid-mute.
    pub fn delete_role(&self, role_id: u64) {
        self.roles.lock().unwrap().retain(|role| role.id != role_id);
    }

    fn record(&self, action: Action) -> PlatformResult<()> {
        if self.forbid_mutations.load(Ordering::SeqCst) {
            return Err(PlatformError::Forbidden);
        }
        self.actions.lock().unwrap().push(action);
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn send_message(&self, origin: &Origin, content: &str) -> PlatformResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((origin.channel_id, content.to_string()));
        Ok(())
    }

    async fn send_file(&self, _origin: &Origin, path: &Path, _caption: &str) -> PlatformResult<()> {
        self.files.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn has_capability(
        &self,
        _guild_id: u64,
        user_id: u64,
        capability: Capability,
    ) -> PlatformResult<bool> {
        if self.admins.contains(&user_id) {
            return Ok(true);
        }
        Ok(self
            .grants
            .get(&user_id)
            .map_or(false, |grants| grants.contains(&capability)))
    }

    async fn member(&self, _guild_id: u64, user_id: u64) -> PlatformResult<Option<MemberInfo>> {
        Ok(self.members.iter().find(|m| m.user_id == user_id).cloned())
    }

    async fn find_member_by_name(&self, _guild_id: u64, name: &str) -> PlatformResult<Option<MemberInfo>> {
        Ok(self
            .members
            .iter()
            .find(|m| m.display_name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn roles(&self, _guild_id: u64) -> PlatformResult<Vec<RoleInfo>> {
        Ok(self.roles.lock().unwrap().clone())
    }

    async fn kick(&self, _guild_id: u64, user_id: u64, reason: &str) -> PlatformResult<()> {
        self.record(Action::Kick {
            user_id,
            reason: reason.to_string(),
        })
    }

    async fn ban(&self, _guild_id: u64, user_id: u64, reason: &str) -> PlatformResult<()> {
        self.record(Action::Ban {
            user_id,
            reason: reason.to_string(),
        })
    }

    async fn add_role(&self, _guild_id: u64, user_id: u64, role_id: u64) -> PlatformResult<()> {
        self.record(Action::AddRole { user_id, role_id })
    }

    async fn remove_role(&self, _guild_id: u64, user_id: u64, role_id: u64) -> PlatformResult<()> {
        self.record(Action::RemoveRole { user_id, role_id })
    }

    async fn purge(&self, _origin: &Origin, count: u64) -> PlatformResult<usize> {
        self.record(Action::Purge { count })?;
        Ok(count as usize)
    }
}

pub fn test_state() -> BotState {
    let config = Config::from_lookup(|key| match key {
        "DISCORD_TOKEN" => Some("test-token".to_string()),
        _ => None,
    })
    .expect("test config");
    BotState::from_config(&config).expect("test state")
}

pub fn guild_message(author: u64, content: &str) -> IncomingMessage {
    IncomingMessage {
        author: Invoker {
            user_id: author,
            name: format!("user{}", author),
            is_bot: false,
        },
        content: content.to_string(),
        origin: Origin {
            channel_id: CHANNEL,
            guild_id: Some(GUILD),
            message_id: 9000,
        },
    }
}

pub fn direct_message(author: u64, content: &str) -> IncomingMessage {
    let mut message = guild_message(author, content);
    message.origin.guild_id = None;
    message
}

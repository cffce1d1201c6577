use crate::platform::{
    Capability, ChatPlatform, MemberInfo, Origin, PlatformError, PlatformResult, RoleInfo,
};
use log::debug;
use serenity::async_trait;
use serenity::http::{Http, HttpError};
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serenity::model::permissions::Permissions;
use serenity::Error as SerenityError;
use std::path::Path;
use std::sync::Arc;

/// Discord's bulk delete accepts at most this many ids per call.
const BULK_DELETE_LIMIT: usize = 100;

/// [`ChatPlatform`] backed by the Discord REST API.
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        DiscordPlatform { http }
    }

    async fn fetch_member(&self, guild_id: u64, user_id: u64) -> PlatformResult<Member> {
        self.http
            .get_member(guild_id, user_id)
            .await
            .map_err(map_error)
    }

    /// Owner gets everything; otherwise @everyone plus the member's roles.
    async fn member_permissions(&self, guild_id: u64, member: &Member) -> PlatformResult<Permissions> {
        let guild = self.http.get_guild(guild_id).await.map_err(map_error)?;

        if guild.owner_id == member.user.id {
            return Ok(Permissions::all());
        }

        let mut permissions = guild
            .roles
            .get(&RoleId(guild_id))
            .map(|everyone| everyone.permissions)
            .unwrap_or_else(Permissions::empty);

        for role_id in &member.roles {
            if let Some(role) = guild.roles.get(role_id) {
                permissions |= role.permissions;
            }
        }

        Ok(permissions)
    }
}

fn map_error(error: SerenityError) -> PlatformError {
    if let SerenityError::Http(http_error) = &error {
        if let HttpError::UnsuccessfulRequest(response) = http_error.as_ref() {
            match response.status_code.as_u16() {
                403 => return PlatformError::Forbidden,
                404 => return PlatformError::NotFound,
                _ => {}
            }
        }
    }
    PlatformError::Other(error.to_string())
}

fn member_info(member: &Member) -> MemberInfo {
    MemberInfo {
        user_id: member.user.id.0,
        display_name: member.display_name().to_string(),
        joined_at: member.joined_at.map(|joined| joined.unix_timestamp()),
        role_ids: member.roles.iter().map(|role| role.0).collect(),
    }
}

fn has(permissions: Permissions, capability: Capability) -> bool {
    if permissions.administrator() {
        return true;
    }
    match capability {
        Capability::Administrator => false,
        Capability::KickMembers => permissions.kick_members(),
        Capability::BanMembers => permissions.ban_members(),
        Capability::ManageMessages => permissions.manage_messages(),
        Capability::ManageRoles => permissions.manage_roles(),
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn send_message(&self, origin: &Origin, content: &str) -> PlatformResult<()> {
        ChannelId(origin.channel_id)
            .say(&self.http, content)
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    async fn send_file(&self, origin: &Origin, path: &Path, caption: &str) -> PlatformResult<()> {
        ChannelId(origin.channel_id)
            .send_files(&self.http, vec![path], |message| message.content(caption))
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    async fn has_capability(
        &self,
        guild_id: u64,
        user_id: u64,
        capability: Capability,
    ) -> PlatformResult<bool> {
        let member = self.fetch_member(guild_id, user_id).await?;
        let permissions = self.member_permissions(guild_id, &member).await?;
        Ok(has(permissions, capability))
    }

    async fn member(&self, guild_id: u64, user_id: u64) -> PlatformResult<Option<MemberInfo>> {
        match self.fetch_member(guild_id, user_id).await {
            Ok(member) => Ok(Some(member_info(&member))),
            Err(PlatformError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_member_by_name(&self, guild_id: u64, name: &str) -> PlatformResult<Option<MemberInfo>> {
        let candidates = GuildId(guild_id)
            .search_members(&self.http, name, Some(10))
            .await
            .map_err(map_error)?;

        let exact = candidates.iter().find(|member| {
            member.user.name.eq_ignore_ascii_case(name)
                || member
                    .nick
                    .as_deref()
                    .map_or(false, |nick| nick.eq_ignore_ascii_case(name))
        });

        Ok(exact.or_else(|| candidates.first()).map(member_info))
    }

    async fn roles(&self, guild_id: u64) -> PlatformResult<Vec<RoleInfo>> {
        let roles = GuildId(guild_id).roles(&self.http).await.map_err(map_error)?;

        Ok(roles
            .into_values()
            .map(|role| RoleInfo {
                id: role.id.0,
                name: role.name,
                position: i64::from(role.position),
            })
            .collect())
    }

    async fn kick(&self, guild_id: u64, user_id: u64, reason: &str) -> PlatformResult<()> {
        GuildId(guild_id)
            .kick_with_reason(&self.http, UserId(user_id), reason)
            .await
            .map_err(map_error)
    }

    async fn ban(&self, guild_id: u64, user_id: u64, reason: &str) -> PlatformResult<()> {
        GuildId(guild_id)
            .ban_with_reason(&self.http, UserId(user_id), 0, reason)
            .await
            .map_err(map_error)
    }

    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> PlatformResult<()> {
        let mut member = self.fetch_member(guild_id, user_id).await?;
        member
            .add_role(&self.http, RoleId(role_id))
            .await
            .map_err(map_error)
    }

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> PlatformResult<()> {
        let mut member = self.fetch_member(guild_id, user_id).await?;
        member
            .remove_role(&self.http, RoleId(role_id))
            .await
            .map_err(map_error)
    }

    async fn purge(&self, origin: &Origin, count: u64) -> PlatformResult<usize> {
        let channel = ChannelId(origin.channel_id);
        let command_message = MessageId(origin.message_id);

        let earlier = channel
            .messages(&self.http, |retriever| retriever.before(command_message).limit(count))
            .await
            .map_err(map_error)?;
        let deleted = earlier.len();

        let mut ids: Vec<MessageId> = earlier.into_iter().map(|message| message.id).collect();
        ids.push(command_message);

        for chunk in ids.chunks(BULK_DELETE_LIMIT) {
            if let [single] = chunk {
                channel
                    .delete_message(&self.http, *single)
                    .await
                    .map_err(map_error)?;
            } else {
                channel
                    .delete_messages(&self.http, chunk.iter())
                    .await
                    .map_err(map_error)?;
            }
        }

        debug!("Purged {} messages in channel {}", deleted, origin.channel_id);
        Ok(deleted)
    }
}

//! 群聊
//!
//! 成员列表在读取时检查是否过期：为空，或最后一个成员没有昵称时，先从服务器刷新整个群聊。

use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::slice::SliceIndex;
use std::sync::Weak;
use tracing::{debug, info, warn};

use crate::im::chat::{AsChat, Chat, ChatPayload, Chats, Keywords};
use crate::im::error::{Error, WxResult};
use crate::im::group::models::Member;
use crate::im::group::rename::truncate_name;
use crate::im::session::{resolve_session, Session};
use crate::im::types::{handle_response, Normalized, Reply, Response};
use crate::im::utils::{resolve_user_name, wrap_user_name, OneOrMany, UserNameRef};

/// 群聊对象
#[derive(Clone)]
pub struct Group {
    chat: Chat,
    members: Chats<Member>,
}

impl Group {
    /// 从原始数据构建，`MemberList` 中的每一项成为一个成员
    pub fn new(payload: ChatPayload, session: Weak<Session>) -> Self {
        let members = payload
            .member_list
            .iter()
            .map(|raw| Member::new(raw.clone(), &payload.user_name, session.clone()))
            .collect();
        Self {
            chat: Chat::new(payload, session),
            members,
        }
    }

    pub fn chat(&self) -> &Chat {
        &self.chat
    }

    /// 成员列表是否需要刷新
    pub fn is_stale(&self) -> bool {
        self.members
            .last()
            .map_or(true, |last| last.nick_name().map_or(true, str::is_empty))
    }

    /// 群聊的成员列表，过期时先刷新
    pub async fn members(&mut self) -> WxResult<&Chats<Member>> {
        if self.is_stale() {
            let session = resolve_session(&*self, "members")?;
            let details = session.config().member_details;
            debug!("[Group] {} 成员列表已过期，刷新中", self);
            self.update_group(details).await?;
        }
        Ok(&self.members)
    }

    /// 按 UserName 查找成员，无法解析的标识返回 [`Error::UnresolvedUser`]
    pub async fn find_member<U: UserNameRef + ?Sized>(
        &mut self,
        user: &U,
    ) -> WxResult<Option<&Member>> {
        let user_name = resolve_user_name(user)?.to_owned();
        Ok(self
            .members()
            .await?
            .iter()
            .find(|member| member.user_name() == user_name))
    }

    /// 按位置取成员
    pub async fn member_at(&mut self, index: usize) -> WxResult<Option<&Member>> {
        Ok(self.members().await?.get(index))
    }

    /// 按范围取成员，例如 `group.members_in(1..3)`
    pub async fn members_in<R>(&mut self, range: R) -> WxResult<Option<&[Member]>>
    where
        R: SliceIndex<[Member], Output = [Member]>,
    {
        Ok(self.members().await?.get(range))
    }

    /// 成员数量
    pub async fn len(&mut self) -> WxResult<usize> {
        Ok(self.members().await?.len())
    }

    /// 在群聊中搜索成员
    pub async fn search(
        &mut self,
        keywords: impl Into<Keywords>,
        attributes: &[(&str, Value)],
    ) -> WxResult<Chats<Member>> {
        let keywords = keywords.into();
        Ok(self.members().await?.search(keywords, attributes))
    }

    /// 群主；`ChatRoomOwner` 为空时取第一个成员
    pub async fn owner(&mut self) -> WxResult<Option<&Member>> {
        self.members().await?;
        let owner = self
            .chat
            .payload()
            .chat_room_owner
            .clone()
            .filter(|owner| !owner.is_empty());
        Ok(match owner {
            Some(owner) => self.members.iter().find(|member| member.user_name() == owner),
            None => self.members.first(),
        })
    }

    /// 当前账号是否为群主
    pub async fn is_owner(&mut self) -> WxResult<bool> {
        if self.chat.payload().is_owner == Some(1) {
            return Ok(true);
        }
        let session = resolve_session(&*self, "is_owner")?;
        Ok(self
            .owner()
            .await?
            .is_some_and(|owner| owner == session.self_chat()))
    }

    /// 从服务器刷新群聊信息，整体替换当前对象
    ///
    /// `members_details` 为 true 时包括成员的详细信息（地区、性别、签名等）。
    pub async fn update_group(&mut self, members_details: bool) -> WxResult<()> {
        let session = resolve_session(&*self, "update_group")?;
        let ret = session
            .transport()
            .update_chatroom(self.user_name(), members_details)
            .await?;
        // 刷新结果必须是同一个群聊，否则保持原状
        let refreshed = match handle_response::<Group>(ret, &*self, "update_group")? {
            Some(Normalized::Single(group)) => Some(group),
            Some(Normalized::Collection(groups)) => groups
                .into_iter()
                .find(|group| group.user_name() == self.user_name()),
            None => None,
        }
        .filter(|group| group.user_name() == self.user_name())
        .ok_or_else(|| {
            warn!("[Group] {} 刷新没有返回该群聊的数据", self);
            Error::missing_payload("update_group")
        })?;
        debug!(
            "[Group] {} 已刷新，成员数: {}",
            refreshed,
            refreshed.members.len()
        );
        *self = refreshed;
        Ok(())
    }

    /// 向群聊中加入用户
    ///
    /// `use_invitation` 为 true 时以发送邀请的方式加入。
    pub async fn add_members<U: UserNameRef>(
        &self,
        users: impl Into<OneOrMany<U>>,
        use_invitation: bool,
    ) -> WxResult<Reply> {
        let session = resolve_session(self, "add_members")?;
        let member_list = wrap_user_name(users.into())?.into_vec();
        info!("[Group] 向 {} 加入 {} 位用户", self, member_list.len());
        let ret = session
            .transport()
            .add_member_into_chatroom(self.user_name(), &member_list, use_invitation)
            .await?;
        handle_response(ret, self, "add_members")
    }

    /// 从群聊中移除用户
    pub async fn remove_members<U: UserNameRef>(
        &self,
        members: impl Into<OneOrMany<U>>,
    ) -> WxResult<Reply> {
        let session = resolve_session(self, "remove_members")?;
        let member_list = wrap_user_name(members.into())?.into_vec();
        info!("[Group] 从 {} 移除 {} 位成员", self, member_list.len());
        let ret = session
            .transport()
            .delete_member_from_chatroom(self.user_name(), &member_list)
            .await?;
        handle_response(ret, self, "remove_members")
    }

    /// 修改群聊名称，超长部分会被截断（最长 32 字节）
    ///
    /// 名称未变化时不发送修改请求；只要修改没有失败，之后都会刷新一次群聊。
    pub async fn rename_group(&mut self, name: &str) -> WxResult<Reply> {
        let session = resolve_session(&*self, "rename_group")?;
        let name = truncate_name(name)?;

        let reply = if self.name() == Some(name.as_str()) {
            debug!("[Group] {} 名称未变化，跳过修改", self);
            None
        } else {
            info!(
                "[Group] 修改群名称: {} => {}",
                self.name().unwrap_or_default(),
                name
            );
            let ret = session
                .transport()
                .set_chatroom_name(self.user_name(), &name)
                .await?;
            handle_response::<Response>(ret, &*self, "rename_group")?
        };

        self.update_group(false).await?;
        Ok(reply)
    }
}

impl Deref for Group {
    type Target = Chat;

    fn deref(&self) -> &Chat {
        &self.chat
    }
}

impl AsChat for Group {
    fn as_chat(&self) -> &Chat {
        &self.chat
    }
}

impl UserNameRef for Group {
    fn user_name_ref(&self) -> Option<&str> {
        Some(self.chat.user_name())
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Group: {}>",
            self.chat.name().unwrap_or(self.chat.user_name())
        )
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("user_name", &self.chat.user_name())
            .field("name", &self.chat.name())
            .field("members", &self.members.len())
            .finish()
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.chat == other.chat
    }
}

impl Eq for Group {}

impl Hash for Group {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chat.hash(state);
    }
}

impl PartialEq<Chat> for Group {
    fn eq(&self, other: &Chat) -> bool {
        self.chat == *other
    }
}

impl PartialEq<Group> for Chat {
    fn eq(&self, other: &Group) -> bool {
        *self == other.chat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::im::group::rename::NAME_BYTE_LIMIT;
    use crate::im::testing::{group_payload, member, ok, session_with};
    use crate::im::transport::ReplayTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn crew() -> Vec<Value> {
        vec![
            member("@alice", "Alice"),
            member("@bob", "Bob"),
            member("@carol", "Carol"),
        ]
    }

    #[tokio::test]
    async fn populated_groups_do_not_refresh() -> WxResult<()> {
        let transport = Arc::new(ReplayTransport::new());
        let session = session_with(transport.clone());
        let mut group = session.group_from_value(group_payload("@@g", "Crew", crew()))?;

        assert!(!group.is_stale());
        assert_eq!(group.len().await?, 3);
        assert_eq!(group.members().await?[0].group_user_name(), "@@g");
        assert_eq!(transport.call_count("update_chatroom"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn empty_groups_refresh_exactly_once() -> WxResult<()> {
        let transport = Arc::new(ReplayTransport::new());
        transport.push_reply("update_chatroom", group_payload("@@g", "Crew", crew()));
        let session = session_with(transport.clone());
        let mut group = session.group_from_value(group_payload("@@g", "Crew", vec![]))?;

        assert!(group.is_stale());
        assert_eq!(group.members().await?.len(), 3);
        assert_eq!(group.len().await?, 3);

        let calls = transport.calls();
        assert_eq!(transport.call_count("update_chatroom"), 1);
        assert_eq!(
            calls[0].args,
            json!({ "userName": "@@g", "detailedMember": false })
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_nick_on_last_member_marks_the_list_stale() -> WxResult<()> {
        let transport = Arc::new(ReplayTransport::new());
        transport.push_reply("update_chatroom", group_payload("@@g", "Crew", crew()));
        let session = session_with(transport.clone());
        let mut partial = crew();
        partial.push(member("@dave", ""));
        let mut group = session.group_from_value(group_payload("@@g", "Crew", partial))?;

        assert!(group.is_stale());
        assert!(group.find_member("@dave").await?.is_none());
        assert_eq!(transport.call_count("update_chatroom"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn find_member_accepts_any_identifier() -> WxResult<()> {
        let session = session_with(Arc::new(ReplayTransport::new()));
        let mut group = session.group_from_value(group_payload("@@g", "Crew", crew()))?;
        let bob = session.chat(ChatPayload::with_user_name("@bob"));

        let found = group.find_member("@bob").await?.cloned();
        assert_eq!(found.as_ref().map(|m| m.user_name()), Some("@bob"));
        assert_eq!(group.find_member(&bob).await?, found.as_ref());
        assert_eq!(
            group.find_member(&json!({ "UserName": "@bob" })).await?,
            found.as_ref()
        );
        assert!(group.find_member("@nobody").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn positional_and_payload_access_are_separate() -> WxResult<()> {
        let session = session_with(Arc::new(ReplayTransport::new()));
        let mut group = session.group_from_value(group_payload("@@g", "Crew", crew()))?;

        assert_eq!(group.member_at(1).await?.map(|m| m.user_name()), Some("@bob"));
        assert!(group.member_at(9).await?.is_none());

        let names: Vec<&str> = group
            .members_in(1..)
            .await?
            .unwrap_or_default()
            .iter()
            .map(|m| m.user_name())
            .collect();
        assert_eq!(names, ["@bob", "@carol"]);
        assert!(group.members_in(2..9).await?.is_none());

        assert_eq!(group.get("NickName"), Some(json!("Crew")));
        assert_eq!(group.get("UserName"), Some(json!("@@g")));
        Ok(())
    }

    #[tokio::test]
    async fn search_filters_members() -> WxResult<()> {
        let session = session_with(Arc::new(ReplayTransport::new()));
        let mut group = session.group_from_value(group_payload("@@g", "Crew", crew()))?;

        let found = group.search("o", &[]).await?;
        let ids: Vec<&str> = found.iter().map(|m| m.user_name()).collect();
        assert_eq!(ids, ["@bob", "@carol"]);
        Ok(())
    }

    #[tokio::test]
    async fn owner_prefers_the_explicit_field() -> WxResult<()> {
        let session = session_with(Arc::new(ReplayTransport::new()));

        let mut raw = group_payload("@@g", "Crew", crew());
        raw["ChatRoomOwner"] = json!("@carol");
        let mut group = session.group_from_value(raw)?;
        assert_eq!(group.owner().await?.map(|m| m.user_name()), Some("@carol"));

        let mut group = session.group_from_value(group_payload("@@g", "Crew", crew()))?;
        assert_eq!(group.owner().await?.map(|m| m.user_name()), Some("@alice"));

        let mut raw = group_payload("@@g", "Crew", crew());
        raw["ChatRoomOwner"] = json!("@gone");
        let mut group = session.group_from_value(raw)?;
        assert!(group.owner().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn is_owner_checks_flag_then_owner_identity() -> WxResult<()> {
        let session = session_with(Arc::new(ReplayTransport::new()));

        let mut raw = group_payload("@@g", "Crew", crew());
        raw["IsOwner"] = json!(1);
        assert!(session.group_from_value(raw)?.is_owner().await?);

        let mut members = crew();
        members.push(member("@me", "Me"));
        let mut raw = group_payload("@@g", "Crew", members);
        raw["ChatRoomOwner"] = json!("@me");
        assert!(session.group_from_value(raw)?.is_owner().await?);

        let mut group = session.group_from_value(group_payload("@@g", "Crew", crew()))?;
        assert!(!group.is_owner().await?);
        Ok(())
    }

    #[tokio::test]
    async fn update_group_replaces_the_whole_group() -> WxResult<()> {
        let transport = Arc::new(ReplayTransport::new());
        let mut refreshed = group_payload("@@g", "Renamed", vec![member("@zed", "Zed")]);
        refreshed["ChatRoomOwner"] = json!("@zed");
        transport.push_reply("update_chatroom", refreshed);
        let session = session_with(transport.clone());
        let mut group = session.group_from_value(group_payload("@@g", "Crew", crew()))?;

        group.update_group(true).await?;
        assert_eq!(group.name(), Some("Renamed"));
        assert_eq!(group.len().await?, 1);
        assert_eq!(group.owner().await?.map(|m| m.user_name()), Some("@zed"));
        assert!(group.session().is_some());
        assert_eq!(transport.calls()[0].args["detailedMember"], true);
        Ok(())
    }

    #[tokio::test]
    async fn update_group_without_payload_fails() -> WxResult<()> {
        let transport = Arc::new(ReplayTransport::new());
        transport.push_reply("update_chatroom", Value::Null);
        let session = session_with(transport);
        let mut group = session.group_from_value(group_payload("@@g", "Crew", crew()))?;

        let err = group.update_group(false).await.unwrap_err();
        assert!(matches!(err, Error::MissingPayload { .. }));
        assert_eq!(group.len().await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn update_group_keeps_identity_when_reply_is_another_group() -> WxResult<()> {
        let transport = Arc::new(ReplayTransport::new());
        transport.push_reply("update_chatroom", group_payload("@@other", "Other", crew()));
        let session = session_with(transport);
        let mut group = session.group_from_value(group_payload("@@g", "Crew", vec![]))?;

        let err = group.update_group(false).await.unwrap_err();
        assert!(matches!(err, Error::MissingPayload { .. }));
        assert_eq!(group.user_name(), "@@g");
        assert_eq!(group.name(), Some("Crew"));
        Ok(())
    }

    #[tokio::test]
    async fn stale_refresh_without_group_data_fails() -> WxResult<()> {
        // 未配置回复时只返回成功状态，没有 UserName
        let transport = Arc::new(ReplayTransport::new());
        let session = session_with(transport.clone());
        let mut group = session.group_from_value(group_payload("@@g", "Crew", vec![]))?;
        let before = group.clone();

        let err = group.members().await.unwrap_err();
        assert!(matches!(err, Error::MissingPayload { .. }));
        assert_eq!(group, before);
        assert_eq!(group.user_name(), "@@g");
        assert_eq!(transport.call_count("update_chatroom"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn membership_changes_wrap_user_names() -> WxResult<()> {
        let transport = Arc::new(ReplayTransport::new());
        let session = session_with(transport.clone());
        let group = session.group_from_value(group_payload("@@g", "Crew", crew()))?;
        let dave = session.chat(ChatPayload::with_user_name("@dave"));

        group.add_members(&dave, true).await?;
        group.add_members(vec!["@erin", "@frank"], false).await?;
        group.remove_members("@bob").await?;

        let calls = transport.calls();
        assert_eq!(
            calls[0].args,
            json!({
                "chatroomUserName": "@@g",
                "memberList": [{ "UserName": "@dave" }],
                "useInvitation": true,
            })
        );
        assert_eq!(
            calls[1].args["memberList"],
            json!([{ "UserName": "@erin" }, { "UserName": "@frank" }])
        );
        assert_eq!(calls[2].operation, "delete_member_from_chatroom");
        assert_eq!(calls[2].args["memberList"], json!([{ "UserName": "@bob" }]));
        Ok(())
    }

    #[tokio::test]
    async fn blank_identifiers_are_never_sent() -> WxResult<()> {
        let transport = Arc::new(ReplayTransport::new());
        let session = session_with(transport.clone());
        let mut members = crew();
        members.push(json!({ "UserName": "", "NickName": "Ghost" }));
        let mut group = session.group_from_value(group_payload("@@g", "Crew", members))?;

        let err = group
            .add_members(vec![json!("@dave"), json!(3)], false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedUser { .. }));
        assert!(matches!(
            group.remove_members(&json!({ "NickName": "Bob" })).await.unwrap_err(),
            Error::UnresolvedUser { .. }
        ));
        assert!(transport.calls().is_empty());

        // 没有 UserName 的标识不会匹配到 UserName 为空的成员
        assert!(matches!(
            group.find_member(&json!(3)).await.unwrap_err(),
            Error::UnresolvedUser { .. }
        ));
        assert!(group.find_member("").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn renaming_to_the_current_name_only_refreshes() -> WxResult<()> {
        let transport = Arc::new(ReplayTransport::new());
        transport.push_reply("update_chatroom", group_payload("@@g", "Crew", crew()));
        let session = session_with(transport.clone());
        let mut group = session.group_from_value(group_payload("@@g", "Crew", crew()))?;

        let reply = group.rename_group("Crew").await?;
        assert!(reply.is_none());
        assert_eq!(transport.call_count("set_chatroom_name"), 0);
        assert_eq!(transport.call_count("update_chatroom"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn long_names_are_truncated_before_renaming() -> WxResult<()> {
        let transport = Arc::new(ReplayTransport::new());
        transport.push_reply("set_chatroom_name", ok());
        transport.push_reply("update_chatroom", group_payload("@@g", "Crew", crew()));
        let session = session_with(transport.clone());
        let mut group = session.group_from_value(group_payload("@@g", "Crew", crew()))?;

        let reply = group.rename_group(&"长".repeat(40)).await?;
        assert!(reply.is_some());

        let calls = transport.calls();
        assert_eq!(calls[0].operation, "set_chatroom_name");
        let sent = calls[0].args["name"].as_str().unwrap_or_default();
        let (encoded, _, _) = encoding_rs::GBK.encode(sent);
        assert!(encoded.len() <= NAME_BYTE_LIMIT);
        assert_eq!(sent.chars().count(), 16);
        assert_eq!(calls[1].operation, "update_chatroom");
        Ok(())
    }

    #[tokio::test]
    async fn groups_compare_equal_to_chats() -> WxResult<()> {
        let session = session_with(Arc::new(ReplayTransport::new()));
        let group = session.group_from_value(group_payload("@@g", "Crew", vec![]))?;
        let chat = session.chat(ChatPayload::with_user_name("@@g"));
        assert!(group == chat);
        assert!(chat == group);
        assert_eq!(group.to_string(), "<Group: Crew>");
        Ok(())
    }
}

//! 群聊集合

use serde_json::Value;
use std::ops::{Deref, DerefMut};

use crate::im::chat::{Chats, Keywords};
use crate::im::error::WxResult;
use crate::im::group::service::Group;
use crate::im::utils::{get_user_name, OneOrMany, UserNameRef};

/// 群聊集合，在 [`Chats`] 的基础上支持按成员搜索
#[derive(Debug, Clone, Default)]
pub struct Groups(Chats<Group>);

impl Groups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Chats<Group> {
        self.0
    }

    /// 按名称关键词和属性搜索群聊，结果仍为 [`Groups`]
    pub fn search(&self, keywords: impl Into<Keywords>, attributes: &[(&str, Value)]) -> Groups {
        Self(self.0.search(keywords, attributes))
    }

    /// 按名称关键词、成员和属性搜索群聊
    ///
    /// 只返回包含 `users` 中全部用户的群聊；成员列表过期的群聊会先刷新。
    pub async fn search_with_members<U: UserNameRef>(
        &mut self,
        keywords: impl Into<Keywords>,
        users: &[U],
        attributes: &[(&str, Value)],
    ) -> WxResult<Groups> {
        let candidates = self.search(keywords, attributes);
        let user_names = get_user_name(OneOrMany::from(users))?.into_vec();

        let mut found = Groups::new();
        for candidate in candidates {
            let Some(group) = self
                .iter_mut()
                .find(|group| group.user_name() == candidate.user_name())
            else {
                continue;
            };
            let mut contains_all = true;
            for user_name in &user_names {
                if group.find_member(user_name).await?.is_none() {
                    contains_all = false;
                    break;
                }
            }
            if contains_all {
                found.push(group.clone());
            }
        }
        Ok(found)
    }
}

impl Deref for Groups {
    type Target = Chats<Group>;

    fn deref(&self) -> &Chats<Group> {
        &self.0
    }
}

impl DerefMut for Groups {
    fn deref_mut(&mut self) -> &mut Chats<Group> {
        &mut self.0
    }
}

impl From<Vec<Group>> for Groups {
    fn from(groups: Vec<Group>) -> Self {
        Self(Chats::from(groups))
    }
}

impl From<Chats<Group>> for Groups {
    fn from(groups: Chats<Group>) -> Self {
        Self(groups)
    }
}

impl FromIterator<Group> for Groups {
    fn from_iter<I: IntoIterator<Item = Group>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Groups {
    type Item = Group;
    type IntoIter = std::vec::IntoIter<Group>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Groups {
    type Item = &'a Group;
    type IntoIter = std::slice::Iter<'a, Group>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::im::testing::{group_payload, member, session_with};
    use crate::im::transport::ReplayTransport;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn search_with_members_requires_every_user() -> WxResult<()> {
        let transport = Arc::new(ReplayTransport::new());
        // 过期的群聊刷新后才能确认成员
        let pair = || vec![member("@alice", "Alice"), member("@bob", "Bob")];
        transport.push_reply("update_chatroom", group_payload("@@lazy", "Rust 夜校", pair()));
        let session = session_with(transport.clone());
        let mut groups: Groups = [
            group_payload("@@one", "Rust 学习", vec![member("@alice", "Alice")]),
            group_payload("@@two", "Rust 周报", pair()),
            group_payload("@@lazy", "Rust 夜校", vec![]),
            group_payload("@@go", "Go 学习", pair()),
        ]
        .into_iter()
        .map(|raw| session.group_from_value(raw))
        .collect::<WxResult<_>>()?;

        let found = groups
            .search_with_members("rust", &["@alice", "@bob"], &[])
            .await?;
        let ids: Vec<&str> = found.iter().map(|g| g.user_name()).collect();
        assert_eq!(ids, ["@@two", "@@lazy"]);
        assert_eq!(transport.call_count("update_chatroom"), 1);

        // 刷新结果保留在原集合中
        assert!(!groups[2].is_stale());

        let everyone = groups
            .search_with_members(Keywords::any(), &[json!({ "UserName": "@alice" })], &[])
            .await?;
        assert_eq!(everyone.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn search_keeps_the_groups_kind() -> WxResult<()> {
        let transport = Arc::new(ReplayTransport::new());
        let session = session_with(transport.clone());
        let pair = || vec![member("@alice", "Alice"), member("@bob", "Bob")];
        let groups: Groups = [
            group_payload("@@one", "Rust 学习", vec![member("@alice", "Alice")]),
            group_payload("@@two", "Rust 周报", pair()),
            group_payload("@@go", "Go 学习", pair()),
        ]
        .into_iter()
        .map(|raw| session.group_from_value(raw))
        .collect::<WxResult<_>>()?;

        let mut rust: Groups = groups.search("rust", &[]);
        assert_eq!(rust.len(), 2);

        // 搜索结果可以继续按成员筛选
        let with_bob = rust.search_with_members(Keywords::any(), &["@bob"], &[]).await?;
        let ids: Vec<&str> = with_bob.iter().map(|g| g.user_name()).collect();
        assert_eq!(ids, ["@@two"]);
        assert_eq!(transport.call_count("update_chatroom"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn unresolvable_users_fail_the_member_search() -> WxResult<()> {
        let session = session_with(Arc::new(ReplayTransport::new()));
        let mut groups: Groups =
            vec![session.group_from_value(group_payload("@@one", "Rust", vec![member("@a", "A")]))?]
                .into();

        let err = groups
            .search_with_members(Keywords::any(), &[json!(3)], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, crate::im::error::Error::UnresolvedUser { .. }));
        Ok(())
    }
}

//! 聊天对象的原始数据

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::im::utils::ensure_list;

/// 成员列表可能为 null、单个字典或数组
fn deserialize_member_list<'de, D>(deserializer: D) -> Result<Vec<ChatPayload>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    ensure_list(raw, true)
        .unwrap_or_default()
        .into_iter()
        .map(|member| serde_json::from_value(member).map_err(serde::de::Error::custom))
        .collect()
}

/// 聊天对象（好友、群聊、群成员）的原始数据
///
/// 已知字段有类型，其余字段原样保存在 `extra` 中。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatPayload {
    #[serde(rename = "UserName", default)]
    pub user_name: String,
    #[serde(rename = "NickName", default, skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    #[serde(rename = "RemarkName", default, skip_serializing_if = "Option::is_none")]
    pub remark_name: Option<String>,
    #[serde(rename = "Alias", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// 群成员的群名片
    #[serde(rename = "DisplayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// 1=男, 2=女, 0=未知
    #[serde(rename = "Sex", default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<i64>,
    #[serde(rename = "Province", default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(rename = "City", default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(rename = "Signature", default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(rename = "HeadImgUrl", default, skip_serializing_if = "Option::is_none")]
    pub head_img_url: Option<String>,
    /// 群主的 UserName
    #[serde(rename = "ChatRoomOwner", default, skip_serializing_if = "Option::is_none")]
    pub chat_room_owner: Option<String>,
    /// 当前账号是否为群主，1 表示是
    #[serde(rename = "IsOwner", default, skip_serializing_if = "Option::is_none")]
    pub is_owner: Option<i64>,
    #[serde(
        rename = "MemberList",
        default,
        deserialize_with = "deserialize_member_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub member_list: Vec<ChatPayload>,
    /// 其他未建模的字段
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatPayload {
    pub fn with_user_name(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            ..Self::default()
        }
    }

    /// 按原始键名取值，已建模和未建模的字段都可查询
    pub fn get(&self, key: &str) -> Option<Value> {
        let text = |field: &Option<String>| field.clone().map(Value::String);
        match key {
            "UserName" => Some(Value::String(self.user_name.clone())),
            "NickName" => text(&self.nick_name),
            "RemarkName" => text(&self.remark_name),
            "Alias" => text(&self.alias),
            "DisplayName" => text(&self.display_name),
            "Sex" => self.sex.map(Value::from),
            "Province" => text(&self.province),
            "City" => text(&self.city),
            "Signature" => text(&self.signature),
            "HeadImgUrl" => text(&self.head_img_url),
            "ChatRoomOwner" => text(&self.chat_room_owner),
            "IsOwner" => self.is_owner.map(Value::from),
            "MemberList" if self.member_list.is_empty() => None,
            "MemberList" => serde_json::to_value(&self.member_list).ok(),
            _ => self.extra.get(key).cloned(),
        }
    }

    /// 转回原始字典
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

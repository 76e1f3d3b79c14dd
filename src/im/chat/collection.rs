//! 聊天对象集合与搜索

use serde_json::Value;
use std::ops::{Deref, DerefMut};

use crate::im::chat::service::Chat;

/// 可以视为聊天对象的实体
pub trait AsChat {
    fn as_chat(&self) -> &Chat;
}

impl AsChat for Chat {
    fn as_chat(&self) -> &Chat {
        self
    }
}

/// 名称关键词，全部为小写
///
/// 单个字符串按空白拆分为多个关键词；列表中的每一项各为一个关键词。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keywords(Vec<String>);

impl Keywords {
    /// 不限制名称
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for Keywords {
    fn from(text: &str) -> Self {
        Self(text.split_whitespace().map(str::to_lowercase).collect())
    }
}

impl From<String> for Keywords {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

impl From<Option<&str>> for Keywords {
    fn from(text: Option<&str>) -> Self {
        text.map(Self::from).unwrap_or_default()
    }
}

impl From<Vec<&str>> for Keywords {
    fn from(words: Vec<&str>) -> Self {
        Self(words.into_iter().map(str::to_lowercase).collect())
    }
}

impl From<Vec<String>> for Keywords {
    fn from(words: Vec<String>) -> Self {
        Self(words.iter().map(|w| w.to_lowercase()).collect())
    }
}

/// 检查聊天对象是否匹配所有名称关键词，关键词为空时直接视为匹配
///
/// 每个关键词只需出现在 nick_name、alias、remark_name、display_name 任一字段中（不区分大小写）。
pub fn match_name(chat: &Chat, keywords: &Keywords) -> bool {
    let fields: Vec<String> = [
        chat.nick_name(),
        chat.alias(),
        chat.remark_name(),
        chat.display_name(),
    ]
    .into_iter()
    .flatten()
    .map(str::to_lowercase)
    .collect();

    keywords
        .as_slice()
        .iter()
        .all(|kw| fields.iter().any(|field| field.contains(kw.as_str())))
}

/// 检查属性是否全部相等，缺失的属性视为 `null`
pub fn match_attributes(chat: &Chat, attributes: &[(&str, Value)]) -> bool {
    attributes
        .iter()
        .all(|(name, expected)| chat.attribute(name).unwrap_or(Value::Null) == *expected)
}

/// 有序的聊天对象集合，顺序与传输层返回的一致
#[derive(Debug, Clone)]
pub struct Chats<T = Chat> {
    items: Vec<T>,
}

impl<T> Chats<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: AsChat + Clone> Chats<T> {
    /// 按名称关键词和属性搜索，返回同类型的集合，顺序不变
    ///
    /// ```ignore
    /// let found = friends.search("alice bob", &[("sex", json!(2))]);
    /// ```
    pub fn search(&self, keywords: impl Into<Keywords>, attributes: &[(&str, Value)]) -> Self {
        let keywords = keywords.into();
        self.items
            .iter()
            .filter(|item| {
                let chat = item.as_chat();
                match_name(chat, &keywords) && match_attributes(chat, attributes)
            })
            .cloned()
            .collect()
    }
}

impl<T> Default for Chats<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for Chats<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> DerefMut for Chats<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<T> From<Vec<T>> for Chats<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T> FromIterator<T> for Chats<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for Chats<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Chats<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

//! 单个/多个对象的统一处理工具
//!
//! 所有“既可以传一个，也可以传一组”的操作都基于 [`OneOrMany`] 和 [`list_or_single`]。

use serde_json::{json, Value};

use crate::im::chat::Chat;
use crate::im::error::{Error, WxResult};
use crate::im::group::{Group, Member};

/// 单个对象或对象列表
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// 逐个映射，保持单个/列表的形态
    pub fn map<U, F>(self, f: F) -> OneOrMany<U>
    where
        F: FnMut(T) -> U,
    {
        list_or_single(f, self)
    }

    /// 统一转为列表（`ensure_list` 的强类型版本）
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }

    /// 仅当为单个对象时返回该对象
    pub fn into_single(self) -> Option<T> {
        match self {
            Self::One(item) => Some(item),
            Self::Many(_) => None,
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, E> OneOrMany<Result<T, E>> {
    /// 遇到第一个错误即返回
    pub fn transpose(self) -> Result<OneOrMany<T>, E> {
        match self {
            Self::One(item) => item.map(OneOrMany::One),
            Self::Many(items) => items
                .into_iter()
                .collect::<Result<Vec<_>, _>>()
                .map(OneOrMany::Many),
        }
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items)
    }
}

impl<'a, T> From<&'a [T]> for OneOrMany<&'a T> {
    fn from(items: &'a [T]) -> Self {
        Self::Many(items.iter().collect())
    }
}

/// JSON 数组视为列表，其余视为单个对象
impl From<Value> for OneOrMany<Value> {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Many(items),
            other => Self::One(other),
        }
    }
}

impl<'a> From<&'a str> for OneOrMany<&'a str> {
    fn from(item: &'a str) -> Self {
        Self::One(item)
    }
}

impl<'a> From<&'a String> for OneOrMany<&'a String> {
    fn from(item: &'a String) -> Self {
        Self::One(item)
    }
}

impl<'a> From<&'a Value> for OneOrMany<&'a Value> {
    fn from(item: &'a Value) -> Self {
        Self::One(item)
    }
}

impl<'a> From<&'a Chat> for OneOrMany<&'a Chat> {
    fn from(item: &'a Chat) -> Self {
        Self::One(item)
    }
}

impl<'a> From<&'a Member> for OneOrMany<&'a Member> {
    fn from(item: &'a Member) -> Self {
        Self::One(item)
    }
}

impl<'a> From<&'a Group> for OneOrMany<&'a Group> {
    fn from(item: &'a Group) -> Self {
        Self::One(item)
    }
}

impl From<String> for OneOrMany<String> {
    fn from(item: String) -> Self {
        Self::One(item)
    }
}

/// 将 `f` 应用于单个对象，或逐个应用于列表中的每一项，结果顺序与输入一致
pub fn list_or_single<T, U, F>(mut f: F, items: OneOrMany<T>) -> OneOrMany<U>
where
    F: FnMut(T) -> U,
{
    match items {
        OneOrMany::One(item) => OneOrMany::One(f(item)),
        OneOrMany::Many(items) => OneOrMany::Many(items.into_iter().map(f).collect()),
    }
}

/// 若不是列表则包装为单元素列表
///
/// `except_false` 为 true 时，空值（null、false、0、""、[]、{}）直接返回 `None`。
pub fn ensure_list(value: Value, except_false: bool) -> Option<Vec<Value>> {
    if except_false && !is_truthy(&value) {
        return None;
    }
    Some(match value {
        Value::Array(items) => items,
        other => vec![other],
    })
}

/// 传输层返回值的真假判断
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// 可以解析出 UserName 的对象
pub trait UserNameRef {
    fn user_name_ref(&self) -> Option<&str>;

    /// 转为至少包含 `UserName` 键的用户字典
    fn to_user_value(&self) -> Value {
        json!({ "UserName": self.user_name_ref().unwrap_or_default() })
    }

    /// 用于错误信息的原始表示
    fn describe_user(&self) -> String {
        self.user_name_ref().unwrap_or_default().to_string()
    }
}

impl UserNameRef for str {
    fn user_name_ref(&self) -> Option<&str> {
        Some(self)
    }
}

impl UserNameRef for String {
    fn user_name_ref(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl UserNameRef for Value {
    fn user_name_ref(&self) -> Option<&str> {
        match self {
            Value::Object(map) => map.get("UserName").and_then(Value::as_str),
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    // 已经是字典的原样保留
    fn to_user_value(&self) -> Value {
        match self {
            Value::Object(_) => self.clone(),
            _ => json!({ "UserName": self.user_name_ref().unwrap_or_default() }),
        }
    }

    fn describe_user(&self) -> String {
        self.to_string()
    }
}

impl<T: UserNameRef + ?Sized> UserNameRef for &T {
    fn user_name_ref(&self) -> Option<&str> {
        (**self).user_name_ref()
    }

    fn to_user_value(&self) -> Value {
        (**self).to_user_value()
    }

    fn describe_user(&self) -> String {
        (**self).describe_user()
    }
}

/// 解析用户标识中的 UserName，缺失或为空时返回 [`Error::UnresolvedUser`]
pub fn resolve_user_name<U: UserNameRef + ?Sized>(user: &U) -> WxResult<&str> {
    user.user_name_ref()
        .filter(|user_name| !user_name.is_empty())
        .ok_or_else(|| Error::UnresolvedUser {
            value: user.describe_user(),
        })
}

/// 确保将用户转化为带有 `UserName` 键的用户字典，任一用户无法解析时整体失败
pub fn wrap_user_name<U: UserNameRef>(users: OneOrMany<U>) -> WxResult<OneOrMany<Value>> {
    list_or_single(
        |user| -> WxResult<Value> {
            resolve_user_name(&user)?;
            Ok(user.to_user_value())
        },
        users,
    )
    .transpose()
}

/// 确保将用户转化为 user_name 字串，任一用户无法解析时整体失败
pub fn get_user_name<U: UserNameRef>(users: OneOrMany<U>) -> WxResult<OneOrMany<String>> {
    list_or_single(
        |user| -> WxResult<String> {
            let user_name = resolve_user_name(&user)?.to_owned();
            Ok(user_name)
        },
        users,
    )
    .transpose()
}

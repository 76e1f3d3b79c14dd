//! 群名称截断
//!
//! 群名称最长 32 字节。依次尝试 GBK 和 UTF-8：对每种编码，从 32 字节到 25 字节逐个截取前缀，
//! 第一个能完整解码的前缀即为结果，不会切断多字节字符。

use encoding_rs::{Encoding, GBK, UTF_8};
use tracing::debug;

use crate::im::error::{Error, WxResult};

/// 群名称的字节上限
pub const NAME_BYTE_LIMIT: usize = 32;

/// 截断时尝试的最短前缀
const NAME_BYTE_FLOOR: usize = 25;

static NAME_ENCODINGS: [&Encoding; 2] = [GBK, UTF_8];

/// 将群名称截断到字节上限以内
pub fn truncate_name(name: &str) -> WxResult<String> {
    NAME_ENCODINGS
        .iter()
        .find_map(|encoding| truncate_with(name, encoding))
        .ok_or_else(|| Error::NameTruncation {
            name: name.to_string(),
        })
}

fn truncate_with(name: &str, encoding: &'static Encoding) -> Option<String> {
    let (encoded, _, unmappable) = encoding.encode(name);
    if unmappable {
        debug!(
            "[Group] 群名称无法用 {} 编码，尝试下一种编码",
            encoding.name()
        );
        return None;
    }

    (NAME_BYTE_FLOOR..=NAME_BYTE_LIMIT).rev().find_map(|length| {
        let prefix = &encoded[..length.min(encoded.len())];
        encoding
            .decode_without_bom_handling_and_without_replacement(prefix)
            .map(|decoded| decoded.into_owned())
    })
}

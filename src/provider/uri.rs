//! 资源地址与路由
//!
//! 地址既可以是裸路径（`/toaster/5`），也可以是完整的 content URI
//! （`content://<authority>/toaster/5`）。路由表在进程内只构建一次。

use crate::data::{DataError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use url::Url;

pub const CONTENT_SCHEME: &str = "content";

/// 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `/toaster`
    LogCollection,
    /// `/toaster/{id}`
    LogItem,
    /// `/packages`
    PackageCollection,
    /// `/filter`
    FilterCollection,
    /// `/filter/{id}`
    FilterItem,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::LogCollection,
        ResourceKind::LogItem,
        ResourceKind::PackageCollection,
        ResourceKind::FilterCollection,
        ResourceKind::FilterItem,
    ];

    /// 是否为单行（带 ID）资源
    pub fn is_item(self) -> bool {
        matches!(self, ResourceKind::LogItem | ResourceKind::FilterItem)
    }

    /// 所属集合的路径
    pub fn collection_path(self) -> &'static str {
        match self {
            ResourceKind::LogCollection | ResourceKind::LogItem => "/toaster",
            ResourceKind::PackageCollection => "/packages",
            ResourceKind::FilterCollection | ResourceKind::FilterItem => "/filter",
        }
    }

    /// 是否支持插入
    pub fn supports_insert(self) -> bool {
        matches!(
            self,
            ResourceKind::LogCollection | ResourceKind::FilterCollection
        )
    }

    /// 是否支持更新/删除
    pub fn supports_write(self) -> bool {
        self != ResourceKind::PackageCollection
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::LogCollection => "log-collection",
            ResourceKind::LogItem => "log-item",
            ResourceKind::PackageCollection => "package-collection",
            ResourceKind::FilterCollection => "filter-collection",
            ResourceKind::FilterItem => "filter-item",
        };
        f.write_str(name)
    }
}

/// 资源地址
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUri {
    authority: Option<String>,
    path: String,
}

impl ContentUri {
    /// 解析地址
    ///
    /// 裸路径必须以 `/` 开头；完整 URI 的 scheme 必须为 `content`。
    /// 路径末尾的 `/` 会被去掉。
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.starts_with('/') {
            return Ok(Self::from_path(None, input));
        }

        let url =
            Url::parse(input).map_err(|_| DataError::UnrecognizedResource(input.to_string()))?;
        if url.scheme() != CONTENT_SCHEME {
            return Err(DataError::UnrecognizedResource(input.to_string()));
        }
        let authority = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DataError::UnrecognizedResource(input.to_string()))?;

        Ok(Self::from_path(Some(authority.to_string()), url.path()))
    }

    /// 构造集合地址
    pub fn for_kind(authority: Option<&str>, kind: ResourceKind) -> Self {
        Self::from_path(authority.map(str::to_string), kind.collection_path())
    }

    fn from_path(authority: Option<String>, path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        let path = if trimmed.is_empty() {
            "/".to_string()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        Self { authority, path }
    }

    /// 追加行 ID，得到单行地址
    pub fn with_appended_id(&self, id: i64) -> Self {
        Self {
            authority: self.authority.clone(),
            path: format!("{}/{id}", self.path),
        }
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 最后一个路径段
    pub fn last_segment(&self) -> Option<&str> {
        self.path.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// 当前地址是否为 `other` 的上级（不含相等）
    pub fn is_ancestor_of(&self, other: &ContentUri) -> bool {
        if self.path == "/" {
            return other.path != "/";
        }
        other
            .path
            .strip_prefix(self.path.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// 两个地址是否处在同一条祖先链上（相等、上级或下级）
    pub fn is_related_to(&self, other: &ContentUri) -> bool {
        self.path == other.path || self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.authority {
            Some(authority) => write!(f, "{CONTENT_SCHEME}://{authority}{}", self.path),
            None => f.write_str(&self.path),
        }
    }
}

impl std::str::FromStr for ContentUri {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// 路由结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    pub kind: ResourceKind,
    /// 单行资源的尾段，原样保留（不做数字校验）
    pub id: Option<String>,
}

static ROUTES: Lazy<Vec<(Regex, ResourceKind)>> = Lazy::new(|| {
    [
        (r"^/toaster$", ResourceKind::LogCollection),
        (r"^/toaster/([^/]+)$", ResourceKind::LogItem),
        (r"^/packages$", ResourceKind::PackageCollection),
        (r"^/filter$", ResourceKind::FilterCollection),
        (r"^/filter/([^/]+)$", ResourceKind::FilterItem),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).expect("静态路由表达式无效"), kind))
    .collect()
});

/// 资源路由器
///
/// 只保存授权名；路由表为进程级静态数据，可在多线程间共享。
#[derive(Debug, Clone)]
pub struct UriRouter {
    authority: String,
}

impl UriRouter {
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// 匹配地址，得到资源类型和可选的行 ID
    pub fn resolve(&self, uri: &ContentUri) -> Result<ResolvedResource> {
        if let Some(authority) = uri.authority() {
            if authority != self.authority {
                return Err(DataError::UnrecognizedResource(uri.to_string()));
            }
        }

        ROUTES
            .iter()
            .find_map(|(re, kind)| {
                re.captures(uri.path()).map(|caps| ResolvedResource {
                    kind: *kind,
                    id: caps.get(1).map(|m| m.as_str().to_string()),
                })
            })
            .ok_or_else(|| DataError::UnrecognizedResource(uri.to_string()))
    }

    /// 集合地址（带授权名）
    pub fn collection_uri(&self, kind: ResourceKind) -> ContentUri {
        ContentUri::for_kind(Some(&self.authority), kind)
    }
}

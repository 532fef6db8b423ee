//! Deep-link 路由
//!
//! 纯函数：只看 payload，不依赖 UI 状态。payload 的 `type` 被解析为
//! `NotificationType`，再查固定的路由表得到目标页面。缺少 `type` 或类型未知时
//! 返回 `None`，这是为了兼容将来的新 payload，不是错误。
//!
//! 新增一种通知只需要在 `NotificationType` 加一个变体、在 `ROUTE_TABLE` 加一行。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::platform::Payload;

/// 导航目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTarget {
    pub stack_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Payload>,
}

/// 已知的通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewFollower,
    NewPost,
}

impl NotificationType {
    pub const ALL: [NotificationType; 2] =
        [NotificationType::NewFollower, NotificationType::NewPost];

    /// 未知类型返回 `None`
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::NewFollower => "new_follower",
            NotificationType::NewPost => "new_post",
        }
    }
}

/// 按 `type` 标记的 payload
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedPayload<'a> {
    Known {
        kind: NotificationType,
        fields: &'a Payload,
    },
    /// 本版本不认识的类型
    Unknown { raw_type: &'a str },
    /// 没有 `type` 字段，或 `type` 不是字符串
    Untyped,
}

impl<'a> TaggedPayload<'a> {
    pub fn classify(payload: &'a Payload) -> Self {
        let Some(raw) = payload.get("type").and_then(Value::as_str) else {
            return TaggedPayload::Untyped;
        };
        match NotificationType::parse(raw) {
            Some(kind) => TaggedPayload::Known { kind, fields: payload },
            None => TaggedPayload::Unknown { raw_type: raw },
        }
    }
}

/// payload 字段到路由参数的映射
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamRule {
    /// payload 中的字段名
    pub from: &'static str,
    /// 路由参数名
    pub to: &'static str,
    /// 缺失时放弃导航
    pub required: bool,
}

/// 路由表的一行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    pub kind: NotificationType,
    pub stack_name: &'static str,
    pub screen_name: Option<&'static str>,
    pub params: &'static [ParamRule],
}

/// 默认路由表
pub const ROUTE_TABLE: &[RouteRule] = &[
    RouteRule {
        kind: NotificationType::NewFollower,
        stack_name: "HomeTab",
        screen_name: Some("UserProfile"),
        params: &[ParamRule {
            from: "followerId",
            to: "userId",
            required: true,
        }],
    },
    RouteRule {
        kind: NotificationType::NewPost,
        stack_name: "HomeTab",
        screen_name: Some("Home"),
        params: &[],
    },
];

/// 读取非空字段（null 和空字符串视为缺失）
fn present<'a>(fields: &'a Payload, name: &str) -> Option<&'a Value> {
    match fields.get(name)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        value => Some(value),
    }
}

/// Deep-link 路由器
#[derive(Debug, Clone, Copy)]
pub struct DeepLinkRouter {
    table: &'static [RouteRule],
}

impl Default for DeepLinkRouter {
    fn default() -> Self {
        Self { table: ROUTE_TABLE }
    }
}

impl DeepLinkRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用自定义路由表
    pub fn with_table(table: &'static [RouteRule]) -> Self {
        Self { table }
    }

    pub fn rule_for(&self, kind: NotificationType) -> Option<&'static RouteRule> {
        self.table.iter().find(|rule| rule.kind == kind)
    }

    /// payload → 路由目标
    pub fn route(&self, payload: &Payload) -> Option<RouteTarget> {
        let (kind, fields) = match TaggedPayload::classify(payload) {
            TaggedPayload::Known { kind, fields } => (kind, fields),
            TaggedPayload::Unknown { raw_type } => {
                debug!(notification_type = raw_type, "No route for unknown notification type");
                return None;
            }
            TaggedPayload::Untyped => {
                debug!("Notification payload has no type, not navigating");
                return None;
            }
        };

        let rule = self.rule_for(kind)?;

        let mut params = Payload::new();
        for param in rule.params {
            match present(fields, param.from) {
                Some(value) => {
                    params.insert(param.to.to_string(), value.clone());
                }
                None if param.required => {
                    debug!(
                        notification_type = kind.as_str(),
                        field = param.from,
                        "Required payload field missing"
                    );
                    return None;
                }
                None => {}
            }
        }

        Some(RouteTarget {
            stack_name: rule.stack_name.to_string(),
            screen_name: rule.screen_name.map(str::to_string),
            params: (!params.is_empty()).then_some(params),
        })
    }
}

/// 使用默认路由表路由
pub fn route(payload: &Payload) -> Option<RouteTarget> {
    DeepLinkRouter::default().route(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_follower_routes_to_profile() {
        let target =
            route(&payload(json!({"type": "new_follower", "followerId": "u123"}))).unwrap();

        assert_eq!(target.stack_name, "HomeTab");
        assert_eq!(target.screen_name.as_deref(), Some("UserProfile"));
        assert_eq!(target.params, Some(payload(json!({"userId": "u123"}))));
    }

    #[test]
    fn test_new_post_routes_home_without_params() {
        let target = route(&payload(json!({"type": "new_post"}))).unwrap();

        assert_eq!(
            target,
            RouteTarget {
                stack_name: "HomeTab".to_string(),
                screen_name: Some("Home".to_string()),
                params: None,
            }
        );
    }

    #[test]
    fn test_new_post_ignores_extra_fields() {
        let target = route(&payload(json!({
            "type": "new_post",
            "postId": "p1",
            "posterId": "u9",
            "notificationId": "n1"
        })))
        .unwrap();
        assert!(target.params.is_none());
    }

    #[test]
    fn test_empty_and_unknown_payloads_have_no_route() {
        assert!(route(&Payload::new()).is_none());
        assert!(route(&payload(json!({"type": "unknown_future_type"}))).is_none());
        assert!(route(&payload(json!({"type": 42}))).is_none());
    }

    #[test]
    fn test_new_follower_without_follower_id_has_no_route() {
        assert!(route(&payload(json!({"type": "new_follower"}))).is_none());
        assert!(route(&payload(json!({"type": "new_follower", "followerId": ""}))).is_none());
        assert!(route(&payload(json!({"type": "new_follower", "followerId": null}))).is_none());
    }

    #[test]
    fn test_non_string_param_is_copied() {
        let target = route(&payload(json!({"type": "new_follower", "followerId": 77}))).unwrap();
        assert_eq!(target.params.unwrap()["userId"], json!(77));
    }

    #[test]
    fn test_every_known_type_has_a_route() {
        let router = DeepLinkRouter::new();
        for kind in NotificationType::ALL {
            assert!(router.rule_for(kind).is_some(), "missing route for {}", kind.as_str());
        }
    }

    #[test]
    fn test_classify() {
        let p = payload(json!({"type": "new_post"}));
        assert!(matches!(
            TaggedPayload::classify(&p),
            TaggedPayload::Known { kind: NotificationType::NewPost, .. }
        ));

        let p = payload(json!({"type": "story_reply"}));
        assert_eq!(TaggedPayload::classify(&p), TaggedPayload::Unknown { raw_type: "story_reply" });

        assert_eq!(TaggedPayload::classify(&Payload::new()), TaggedPayload::Untyped);
    }

    #[test]
    fn test_custom_table() {
        const TABLE: &[RouteRule] = &[RouteRule {
            kind: NotificationType::NewPost,
            stack_name: "FeedTab",
            screen_name: Some("PostDetail"),
            params: &[ParamRule { from: "postId", to: "postId", required: false }],
        }];
        let router = DeepLinkRouter::with_table(TABLE);

        let target = router.route(&payload(json!({"type": "new_post", "postId": "p1"}))).unwrap();
        assert_eq!(target.stack_name, "FeedTab");
        assert_eq!(target.params.unwrap()["postId"], "p1");

        // 表中没有 new_follower
        let follower = payload(json!({"type": "new_follower", "followerId": "u1"}));
        assert!(router.route(&follower).is_none());
    }

    #[test]
    fn test_route_target_serializes_camel_case() {
        let target =
            route(&payload(json!({"type": "new_follower", "followerId": "u123"}))).unwrap();
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(
            json,
            json!({
                "stackName": "HomeTab",
                "screenName": "UserProfile",
                "params": {"userId": "u123"}
            })
        );

        let target = route(&payload(json!({"type": "new_post"}))).unwrap();
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json, json!({"stackName": "HomeTab", "screenName": "Home"}));
    }
}

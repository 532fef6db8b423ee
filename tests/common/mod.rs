//! 集成测试共用的 registry 替身

#![allow(dead_code)]

use async_trait::async_trait;
use push_link::{EventHub, EventKind, PushToken, RegistryError, RegistryTransport};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// 一次 registry 调用
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryCall {
    Register { credential: String, token: String },
    Deregister { credential: String, token: String },
}

#[derive(Debug, Clone)]
struct Record {
    active: bool,
}

/// 模拟后端语义的内存 registry：同一 (凭证, token) 重复注册只更新记录
#[derive(Default)]
pub struct MemoryRegistry {
    records: Mutex<HashMap<(String, String), Record>>,
    calls: Mutex<Vec<RegistryCall>>,
    /// 注销时观察到的点击监听器数量
    listeners_at_deregister: Mutex<Vec<usize>>,
    probe: Option<EventHub>,
    fail: AtomicBool,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注销时记录 `hub` 上的监听器数量
    pub fn with_listener_probe(hub: EventHub) -> Self {
        Self {
            probe: Some(hub),
            ..Self::default()
        }
    }

    pub fn fail_requests(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn register_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RegistryCall::Register { .. }))
            .count()
    }

    pub fn deregister_calls(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RegistryCall::Deregister { credential, token } => Some((credential, token)),
                _ => None,
            })
            .collect()
    }

    pub fn listeners_at_deregister(&self) -> Vec<usize> {
        self.listeners_at_deregister.lock().unwrap().clone()
    }

    /// 当前有效的记录数
    pub fn active_records(&self) -> usize {
        self.records.lock().unwrap().values().filter(|r| r.active).count()
    }
}

#[async_trait]
impl RegistryTransport for MemoryRegistry {
    fn name(&self) -> &str {
        "memory"
    }

    async fn register(&self, credential: &str, token: &PushToken) -> Result<(), RegistryError> {
        self.calls.lock().unwrap().push(RegistryCall::Register {
            credential: credential.to_string(),
            token: token.value.clone(),
        });
        if self.fail.load(Ordering::SeqCst) {
            return Err(RegistryError::Status { status: 502, body: "bad gateway".to_string() });
        }
        self.records
            .lock()
            .unwrap()
            .entry((credential.to_string(), token.value.clone()))
            .and_modify(|r| r.active = true)
            .or_insert(Record { active: true });
        Ok(())
    }

    async fn deregister(&self, credential: &str, token: &str) -> Result<(), RegistryError> {
        self.calls.lock().unwrap().push(RegistryCall::Deregister {
            credential: credential.to_string(),
            token: token.to_string(),
        });
        if let Some(hub) = &self.probe {
            self.listeners_at_deregister
                .lock()
                .unwrap()
                .push(hub.listener_count(EventKind::Interacted));
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RegistryError::Status { status: 502, body: "bad gateway".to_string() });
        }
        if let Some(record) = self
            .records
            .lock()
            .unwrap()
            .get_mut(&(credential.to_string(), token.to_string()))
        {
            record.active = false;
        }
        Ok(())
    }
}

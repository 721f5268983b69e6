//! Mock LIMS 会话
//!
//! 用于单元测试的 mock 实现，支持注入认证失败、拒绝和传输错误。

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use contracts::{
    ContractError, PushPayload, PushResponse, RemoteSession, SessionFactory, SessionFuture,
};
use tracing::instrument;

/// Mock 会话配置
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// 认证失败的调用序号（从 1 开始，跨会话累计）
    pub fail_auth_calls: Vec<u32>,
    /// 从第几次 push 开始接受（None 表示一律拒绝）
    pub accept_from_push: Option<u32>,
    /// 拒绝时返回传输错误而不是 `success == false`
    pub push_errors: bool,
    /// `open()` 直接失败
    pub fail_open: bool,
    /// 每次 push 的模拟延迟
    pub push_latency: Option<Duration>,
}

impl MockConfig {
    /// 每次 push 都被接受
    pub fn accept_all() -> Self {
        Self {
            accept_from_push: Some(1),
            ..Default::default()
        }
    }

    /// 每次 push 都被拒绝
    pub fn reject_all() -> Self {
        Self::default()
    }

    /// 第 `n` 次 push 起被接受
    pub fn accept_from(n: u32) -> Self {
        Self {
            accept_from_push: Some(n),
            ..Default::default()
        }
    }
}

/// 调用记录（在工厂与其打开的所有会话之间共享）
#[derive(Debug, Default)]
pub struct MockCalls {
    opens: AtomicU32,
    authenticates: AtomicU32,
    pushes: AtomicU32,
    payloads: Mutex<Vec<(String, PushPayload)>>,
}

impl MockCalls {
    /// `open()` 调用次数
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    /// `authenticate()` 调用次数
    pub fn authenticates(&self) -> u32 {
        self.authenticates.load(Ordering::SeqCst)
    }

    /// `push()` 调用次数
    pub fn pushes(&self) -> u32 {
        self.pushes.load(Ordering::SeqCst)
    }

    /// 已推送的 (endpoint, payload)
    pub fn payloads(&self) -> Vec<(String, PushPayload)> {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Mock 会话
#[derive(Debug)]
pub struct MockSession {
    config: MockConfig,
    calls: Arc<MockCalls>,
}

impl MockSession {
    /// 使用配置创建 mock 会话
    pub fn new(config: MockConfig) -> Self {
        Self::with_calls(config, Arc::default())
    }

    fn with_calls(config: MockConfig, calls: Arc<MockCalls>) -> Self {
        Self { config, calls }
    }

    /// 调用记录
    pub fn calls(&self) -> Arc<MockCalls> {
        Arc::clone(&self.calls)
    }
}

impl RemoteSession for MockSession {
    fn authenticate(&mut self) -> SessionFuture<'_, bool> {
        let call = self.calls.authenticates.fetch_add(1, Ordering::SeqCst) + 1;
        let ok = !self.config.fail_auth_calls.contains(&call);
        Box::pin(async move { ok })
    }

    #[instrument(name = "mock_session_push", skip_all, fields(endpoint = %endpoint))]
    fn push<'a>(
        &'a mut self,
        endpoint: &'a str,
        payload: &'a PushPayload,
    ) -> SessionFuture<'a, Result<PushResponse, ContractError>> {
        let call = self.calls.pushes.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls
            .payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((endpoint.to_string(), payload.clone()));

        let accepted = self.config.accept_from_push.is_some_and(|n| call >= n);
        let push_errors = self.config.push_errors;
        let latency = self.config.push_latency;

        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            if accepted {
                Ok(PushResponse::accepted())
            } else if push_errors {
                Err(ContractError::push(endpoint, format!("mock transport error on push {call}")))
            } else {
                Ok(PushResponse::rejected())
            }
        })
    }
}

/// Mock 会话工厂
#[derive(Debug, Clone, Default)]
pub struct MockSessionFactory {
    config: MockConfig,
    calls: Arc<MockCalls>,
}

impl MockSessionFactory {
    /// 使用配置创建工厂
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            calls: Arc::default(),
        }
    }

    /// 调用记录
    pub fn calls(&self) -> Arc<MockCalls> {
        Arc::clone(&self.calls)
    }
}

impl SessionFactory for MockSessionFactory {
    fn open(&self) -> Result<Box<dyn RemoteSession>, ContractError> {
        self.calls.opens.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_open {
            return Err(ContractError::SessionOpen {
                message: "mock open failure".into(),
            });
        }
        Ok(Box::new(MockSession::with_calls(
            self.config.clone(),
            Arc::clone(&self.calls),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Message;

    fn payload() -> PushPayload {
        PushPayload::new("consumer", &Message::from([b"L|1|N\r".as_slice()]), None)
    }

    #[tokio::test]
    async fn test_accept_from() {
        let mut session = MockSession::new(MockConfig::accept_from(2));
        let payload = payload();

        assert!(!session.push("push", &payload).await.unwrap().success);
        assert!(session.push("push", &payload).await.unwrap().success);
        assert!(session.push("push", &payload).await.unwrap().success);
        assert_eq!(session.calls().pushes(), 3);
        assert_eq!(session.calls().payloads()[0].0, "push");
    }

    #[tokio::test]
    async fn test_auth_failures_by_call() {
        let mut session = MockSession::new(MockConfig {
            fail_auth_calls: vec![1, 3],
            ..Default::default()
        });
        assert!(!session.authenticate().await);
        assert!(session.authenticate().await);
        assert!(!session.authenticate().await);
        assert_eq!(session.calls().authenticates(), 3);
    }

    #[tokio::test]
    async fn test_push_errors() {
        let mut session = MockSession::new(MockConfig {
            push_errors: true,
            ..Default::default()
        });
        let err = session.push("push", &payload()).await.unwrap_err();
        assert!(matches!(err, ContractError::Push { .. }));
    }

    #[tokio::test]
    async fn test_factory_shares_calls() {
        let factory = MockSessionFactory::new(MockConfig::accept_all());
        let payload = payload();

        for _ in 0..2 {
            let mut session = factory.open().unwrap();
            assert!(session.authenticate().await);
            assert!(session.push("push", &payload).await.unwrap().success);
        }

        let calls = factory.calls();
        assert_eq!(calls.opens(), 2);
        assert_eq!(calls.authenticates(), 2);
        assert_eq!(calls.pushes(), 2);
    }

    #[test]
    fn test_factory_open_failure() {
        let factory = MockSessionFactory::new(MockConfig {
            fail_open: true,
            ..Default::default()
        });
        assert!(factory.open().is_err());
        assert_eq!(factory.calls().opens(), 1);
    }
}

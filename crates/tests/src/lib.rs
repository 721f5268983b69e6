//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置加载到分发器的装配
//! - 模拟 e2e 测试（TCP 仪器 → 队列 → 分发 → 文件 + mock LIMS）
//! - 关闭时取消挂起的投递

#[cfg(test)]
mod contract_tests {
    use contracts::{ConfigVersion, WrapperKind};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = ConfigVersion::V1;
        let _ = WrapperKind::Records;
    }

    #[test]
    fn test_config_file_to_dispatcher() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            r#"
[server]
listen = "127.0.0.1"
port = 4011

[output]
directory = "{}"

[lims]
url = "http://admin:pw@lims.local/senaite"
retries = 2
delay_secs = 0.0

[[wrappers]]
sender = "LYSIS"
kind = "records"
"#,
            dir.path().display()
        );

        let config = config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml).unwrap();
        let factory = lims_session::MockSessionFactory::default();
        let dispatcher = dispatcher::create_dispatcher(
            &config,
            Some(std::sync::Arc::new(factory)),
            dispatcher::SinkTasks::new(),
        )
        .unwrap();

        let names: Vec<String> = dispatcher.metrics().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["file".to_string(), "remote".to_string()]);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::net::SocketAddr;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::record::{ACK, ENQ, EOT};
    use contracts::{
        BridgeConfig, LimsConfig, OutputConfig, SessionFactory, WrapperConfig, WrapperKind,
    };
    use dispatcher::{create_dispatcher, DispatchConsumer, ShutdownCoordinator, SinkTasks};
    use ingestion::{message_queue, AstmEndpoint};
    use lims_session::{MockCalls, MockConfig, MockSessionFactory};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use url::Url;

    const LYSIS: [&[u8]; 3] = [
        b"\x021H|\\^&|||LYSIS^1.0|||||||P|LIS2-A2\r\x0300\r\n",
        b"\x022R|1|^^^WBC|6.1|10^3/uL||N||F\r\x0300\r\n",
        b"\x023L|1|N\r\x0300\r\n",
    ];

    const OTHER: [&[u8]; 2] = [
        b"\x021H|\\^&|||OTHER\r\x0300\r\n",
        b"\x022L|1|N\r\x0300\r\n",
    ];

    /// 被测桥接：端点、消费者、分发器与关闭协调器
    struct Bridge {
        addr: SocketAddr,
        coordinator: ShutdownCoordinator,
        calls: Arc<MockCalls>,
    }

    async fn start_bridge(output: &Path, mock: MockConfig, retries: u32, delay: f64) -> Bridge {
        let mut lims = LimsConfig::new(Url::parse("http://admin:pw@lims.local/senaite").unwrap());
        lims.retries = retries;
        lims.delay_secs = delay;

        let config = BridgeConfig {
            output: Some(OutputConfig::new(output)),
            lims: Some(lims),
            wrappers: vec![WrapperConfig {
                sender: "LYSIS".to_string(),
                kind: WrapperKind::Records,
            }],
            ..Default::default()
        };

        let factory = MockSessionFactory::new(mock);
        let calls = factory.calls();
        let tasks = SinkTasks::new();
        let dispatcher = Arc::new(
            create_dispatcher(
                &config,
                Some(Arc::new(factory) as Arc<dyn SessionFactory>),
                tasks.clone(),
            )
            .unwrap(),
        );

        let (producer, queue) = message_queue();
        let endpoint = AstmEndpoint::bind("127.0.0.1", 0, producer).await.unwrap();
        let addr = endpoint.local_addr().unwrap();

        let mut coordinator = ShutdownCoordinator::new(tasks);
        coordinator.register("endpoint", endpoint.spawn());
        coordinator.register(
            "dispatch_consumer",
            DispatchConsumer::new(queue, dispatcher).spawn(),
        );

        Bridge {
            addr,
            coordinator,
            calls,
        }
    }

    /// 模拟仪器发送一次完整传输
    async fn transmit(addr: SocketAddr, frames: &[&[u8]]) {
        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut reply = [0u8; 1];

        client.write_all(&[ENQ]).await.unwrap();
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[0], ACK);

        for frame in frames {
            client.write_all(frame).await.unwrap();
            client.read_exact(&mut reply).await.unwrap();
            assert_eq!(reply[0], ACK);
        }
        client.write_all(&[EOT]).await.unwrap();
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// End-to-end: instrument -> endpoint -> queue -> dispatcher -> file + LIMS
    #[tokio::test]
    async fn test_e2e_file_and_remote_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = start_bridge(dir.path(), MockConfig::accept_all(), 3, 0.0).await;

        transmit(bridge.addr, &LYSIS).await;
        transmit(bridge.addr, &OTHER).await;

        let calls = Arc::clone(&bridge.calls);
        wait_until(|| calls.pushes() == 2 && files_in(dir.path()).len() == 2).await;

        let files = files_in(dir.path());
        assert!(files[0].starts_with("LYSIS-"), "{files:?}");
        assert!(files[1].starts_with("OTHER-"), "{files:?}");
        assert!(files.iter().all(|name| name.ends_with(".txt")));

        // 文件内容为原始帧的拼接
        let written = std::fs::read(dir.path().join(&files[0])).unwrap();
        assert_eq!(written, LYSIS.concat());

        // 每条消息单独打开会话，LYSIS 带结构化 json
        assert_eq!(calls.opens(), 2);
        let payloads = calls.payloads();
        let lysis = payloads
            .iter()
            .map(|(_, payload)| payload)
            .find(|payload| payload.messages.len() == 3)
            .unwrap();
        assert_eq!(lysis.consumer, "senaite.lis2a.import");
        assert!(lysis.json.is_some());
        let other = payloads
            .iter()
            .map(|(_, payload)| payload)
            .find(|payload| payload.messages.len() == 2)
            .unwrap();
        assert!(other.json.is_none());

        let report = bridge.coordinator.shutdown().await;
        assert_eq!(report.services_stopped, 2);
        assert_eq!(report.sinks_cancelled, 0);
    }

    /// 关闭时，处于重试等待中的投递被取消而不再 push
    #[tokio::test]
    async fn test_shutdown_cancels_pending_retry() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = start_bridge(dir.path(), MockConfig::reject_all(), 5, 3600.0).await;

        transmit(bridge.addr, &LYSIS).await;

        let calls = Arc::clone(&bridge.calls);
        wait_until(|| calls.pushes() == 1 && files_in(dir.path()).len() == 1).await;

        let report = bridge.coordinator.shutdown().await;
        assert_eq!(report.services_stopped, 2);
        assert!(report.sinks_cancelled >= 1, "{report:?}");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.pushes(), 1);
    }

    /// 断开于传输中途的消息不会被分发
    #[tokio::test]
    async fn test_partial_transmission_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = start_bridge(dir.path(), MockConfig::accept_all(), 1, 0.0).await;

        {
            let mut client = TcpStream::connect(bridge.addr).await.unwrap();
            let mut reply = [0u8; 1];
            client.write_all(&[ENQ]).await.unwrap();
            client.read_exact(&mut reply).await.unwrap();
            client.write_all(LYSIS[0]).await.unwrap();
            client.read_exact(&mut reply).await.unwrap();
        }

        transmit(bridge.addr, &OTHER).await;

        let calls = Arc::clone(&bridge.calls);
        wait_until(|| calls.pushes() == 1).await;
        wait_until(|| files_in(dir.path()).len() == 1).await;
        assert!(files_in(dir.path())[0].starts_with("OTHER-"));

        bridge.coordinator.shutdown().await;
    }
}

//! # Dispatcher
//!
//! 消息分发模块。
//!
//! 负责：
//! - 按入队顺序消费 `Message`
//! - Fan-out 到文件 sink 与远端投递 sink
//! - 隔离慢 sink，不阻塞主链路
//! - 关闭时取消所有未完成的 sink 任务

pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod registry;
pub mod shutdown;
pub mod sinks;

pub use consumer::DispatchConsumer;
pub use contracts::Message;
pub use dispatcher::{create_dispatcher, Dispatch, Dispatcher, DispatcherBuilder};
pub use error::DispatcherError;
pub use handle::{DrainReport, SinkTasks};
pub use self::metrics::{MetricsSnapshot, SinkMetrics};
pub use registry::{RecordsTransformer, WrapperRegistry};
pub use shutdown::{ShutdownCoordinator, ShutdownReport};
pub use sinks::{deliver, FileSink, RemoteSink};

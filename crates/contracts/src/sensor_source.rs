//! SensorSource - 仿真器侧的传感器协作者
//!
//! 通过回调异步交付原始 payload 与采集时间；payload 的解码由使用方负责。

use bytes::Bytes;
use std::sync::Arc;

/// 传感器回调交付的一个原始样本
#[derive(Debug, Clone)]
pub struct RawSample {
    /// 不透明 payload (zero-copy)
    pub payload: Bytes,

    /// 仿真器采集时间 (秒)
    pub capture_time_s: f64,
}

/// 样本回调，可能在任意线程上被调用
pub type SampleCallback = Arc<dyn Fn(RawSample) + Send + Sync>;

/// 传感器数据源
///
/// ```ignore
/// source.listen(Arc::new(|sample| {
///     tracing::debug!(capture_time_s = sample.capture_time_s, "sample");
/// }));
/// source.stop();
/// ```
pub trait SensorSource: Send + Sync {
    fn sensor_id(&self) -> &str;

    /// 注册回调并开始交付；已在监听时重复调用无效果
    fn listen(&self, callback: SampleCallback);

    /// 停止交付
    fn stop(&self);

    fn is_listening(&self) -> bool;
}

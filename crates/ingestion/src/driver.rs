//! GatedSensorDriver - 传感器回调到 ReleaseGate 的适配
//!
//! 模拟器回调在任意线程触发；驱动器把每次回调串行化，
//! 将采集时间转换为毫秒级 `TimestampKey`，再交给闸门。
//! 外部同步信号通过 [`GatedSensorDriver::on_release`] 转发。

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use contracts::{RawSample, SensorSource, TimestampKey};
use parking_lot::Mutex;
use sync_engine::{OfferOutcome, ReleaseGate, ReleaseOutcome};
use tracing::{error, instrument, trace};

use crate::{IngestionError, Result};

/// 原始样本解码函数
pub type SampleDecoder<T> = Arc<dyn Fn(RawSample) -> Result<T> + Send + Sync>;

/// 回调错误最多保留条数，超出时丢弃最旧的
pub const MAX_RETAINED_FAILURES: usize = 256;

#[derive(Default)]
struct FailureLog {
    retained: VecDeque<IngestionError>,
    dropped: u64,
}

impl FailureLog {
    fn push(&mut self, error: IngestionError) {
        if self.retained.len() == MAX_RETAINED_FAILURES {
            self.retained.pop_front();
            self.dropped += 1;
        }
        self.retained.push_back(error);
    }
}

struct DriverCore<T> {
    sensor_id: String,
    gate: Arc<ReleaseGate<T>>,
    decoder: SampleDecoder<T>,
    /// 串行化回调
    producer: Mutex<()>,
    failures: Mutex<FailureLog>,
}

impl<T: Send + 'static> DriverCore<T> {
    fn handle(&self, sample: RawSample) -> Result<OfferOutcome> {
        let _serial = self.producer.lock();
        observability::record_sample_received(&self.sensor_id);

        let capture_time_s = sample.capture_time_s;
        if !capture_time_s.is_finite() || capture_time_s < 0.0 {
            return Err(IngestionError::InvalidCaptureTime {
                sensor_id: self.sensor_id.clone(),
                capture_time_s,
            });
        }
        if sample.payload.is_empty() {
            return Err(IngestionError::EmptyPayload {
                sensor_id: self.sensor_id.clone(),
                capture_time_s,
            });
        }

        let key = TimestampKey::from_seconds(capture_time_s);
        let record = (self.decoder)(sample)?;
        let outcome = self.gate.offer(key.clone(), record)?;

        trace!(sensor_id = %self.sensor_id, key = %key, ?outcome, "sample offered");
        Ok(outcome)
    }
}

/// 带释放闸门的传感器驱动器
pub struct GatedSensorDriver<T> {
    source: Arc<dyn SensorSource>,
    core: Arc<DriverCore<T>>,
}

impl<T> fmt::Debug for GatedSensorDriver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatedSensorDriver")
            .field("sensor_id", &self.core.sensor_id)
            .field("listening", &self.source.is_listening())
            .finish()
    }
}

impl GatedSensorDriver<Bytes> {
    /// 不解码，原样转发 payload
    pub fn raw(source: Arc<dyn SensorSource>, gate: Arc<ReleaseGate<Bytes>>) -> Self {
        Self::new(
            source,
            gate,
            Arc::new(|sample: RawSample| -> Result<Bytes> { Ok(sample.payload) }),
        )
    }
}

impl<T: Send + 'static> GatedSensorDriver<T> {
    pub fn new(
        source: Arc<dyn SensorSource>,
        gate: Arc<ReleaseGate<T>>,
        decoder: SampleDecoder<T>,
    ) -> Self {
        let core = Arc::new(DriverCore {
            sensor_id: source.sensor_id().to_string(),
            gate,
            decoder,
            producer: Mutex::new(()),
            failures: Mutex::new(FailureLog::default()),
        });
        Self { source, core }
    }

    pub fn sensor_id(&self) -> &str {
        &self.core.sensor_id
    }

    pub fn gate(&self) -> &Arc<ReleaseGate<T>> {
        &self.core.gate
    }

    /// 注册回调并开始监听
    ///
    /// 回调中的错误会被记录，可通过 [`GatedSensorDriver::take_failures`] 取出；
    /// 只保留最近 [`MAX_RETAINED_FAILURES`] 条。
    pub fn start(&self) {
        let core = Arc::clone(&self.core);
        self.source.listen(Arc::new(move |sample| {
            if let Err(e) = core.handle(sample) {
                error!(sensor_id = %core.sensor_id, error = %e, "sensor sample rejected");
                core.failures.lock().push(e);
            }
        }));
    }

    pub fn stop(&self) {
        self.source.stop();
    }

    pub fn is_listening(&self) -> bool {
        self.source.is_listening()
    }

    /// 直接处理一个样本 (与回调走同一路径)
    pub fn handle_sample(&self, sample: RawSample) -> Result<OfferOutcome> {
        self.core.handle(sample)
    }

    /// 转发外部释放信号
    #[instrument(name = "gated_driver_release", skip(self), fields(sensor_id = %self.core.sensor_id))]
    pub fn on_release(&self, key: TimestampKey) -> Result<ReleaseOutcome> {
        Ok(self.core.gate.release(key)?)
    }

    /// 外部超时：丢弃一个仍在闸门中的样本
    pub fn discard(&self, key: &TimestampKey) -> Result<T> {
        Ok(self.core.gate.discard(key)?)
    }

    /// 取出回调中累计的错误，最旧的在前
    pub fn take_failures(&self) -> Vec<IngestionError> {
        self.core.failures.lock().retained.drain(..).collect()
    }

    /// 因超出保留上限而丢弃的错误数
    pub fn dropped_failures(&self) -> u64 {
        self.core.failures.lock().dropped
    }
}

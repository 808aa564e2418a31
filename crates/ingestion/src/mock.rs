//! Mock 传感器源
//!
//! 用于无模拟器环境的测试，实现 `SensorSource`。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::{RawSample, SampleCallback, SensorSource};
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Mock 传感器源配置
#[derive(Debug, Clone)]
pub struct MockSensorConfig {
    /// 发送频率 (Hz)，同时决定采集时间间隔
    pub frequency_hz: f64,

    /// 每个样本的 payload 字节数
    pub payload_size: usize,

    /// 第一个样本的采集时间 (秒)
    pub start_time_s: f64,

    /// 最多发送的样本数 (None = 不限)
    pub max_samples: Option<u64>,

    /// 按真实时间节奏发送
    pub realtime: bool,
}

impl Default for MockSensorConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 20.0,
            payload_size: 16 * 1024,
            start_time_s: 0.0,
            max_samples: None,
            realtime: true,
        }
    }
}

/// Mock 传感器源
///
/// `listen` 后在后台线程中按配置频率生成样本，采集时间按
/// `start_time_s + n / frequency_hz` 递增；也可以用 [`MockSensorSource::trigger`]
/// 手动投递样本。
pub struct MockSensorSource {
    sensor_id: String,
    config: MockSensorConfig,
    listening: Arc<AtomicBool>,
    callback: Mutex<Option<SampleCallback>>,
    sent: Arc<AtomicU64>,
}

impl MockSensorSource {
    pub fn new(sensor_id: impl Into<String>, config: MockSensorConfig) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            config,
            listening: Arc::new(AtomicBool::new(false)),
            callback: Mutex::new(None),
            sent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 不启动后台线程，只接受 [`MockSensorSource::trigger`]
    pub fn manual(sensor_id: impl Into<String>) -> Self {
        Self::new(
            sensor_id,
            MockSensorConfig {
                max_samples: Some(0),
                ..Default::default()
            },
        )
    }

    /// 同步调用已注册的回调
    ///
    /// 未注册回调时返回 false。
    pub fn trigger(&self, sample: RawSample) -> bool {
        let callback = self.callback.lock().clone();
        match callback {
            Some(callback) => {
                callback(sample);
                true
            }
            None => false,
        }
    }

    /// 后台线程已发送的样本数
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

impl SensorSource for MockSensorSource {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn listen(&self, callback: SampleCallback) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.callback.lock() = Some(Arc::clone(&callback));

        if self.config.max_samples == Some(0) {
            return;
        }

        let sensor_id = self.sensor_id.clone();
        let config = self.config.clone();
        let listening = Arc::clone(&self.listening);
        let sent = Arc::clone(&self.sent);
        let period_s = 1.0 / config.frequency_hz.max(f64::MIN_POSITIVE);

        thread::spawn(move || {
            let payload = Bytes::from(vec![0u8; config.payload_size]);
            let mut index: u64 = 0;

            debug!(
                sensor_id = %sensor_id,
                frequency_hz = config.frequency_hz,
                "mock sensor started"
            );

            while listening.load(Ordering::Relaxed) {
                if config.max_samples.is_some_and(|max| index >= max) {
                    break;
                }

                let capture_time_s = config.start_time_s + index as f64 * period_s;
                callback(RawSample {
                    payload: payload.clone(),
                    capture_time_s,
                });
                index += 1;
                sent.store(index, Ordering::Relaxed);

                trace!(sensor_id = %sensor_id, capture_time_s, "mock sample sent");

                if config.realtime {
                    thread::sleep(Duration::from_secs_f64(period_s));
                }
            }

            listening.store(false, Ordering::SeqCst);
            debug!(sensor_id = %sensor_id, sent = index, "mock sensor stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn wait_until(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_bounded_source_stops_itself() {
        let source = MockSensorSource::new(
            "lidar",
            MockSensorConfig {
                frequency_hz: 10.0,
                payload_size: 8,
                start_time_s: 2.0,
                max_samples: Some(5),
                realtime: false,
            },
        );

        let times = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&times);
        source.listen(Arc::new(move |sample: RawSample| {
            assert_eq!(sample.payload.len(), 8);
            sink.lock().push(sample.capture_time_s);
        }));

        wait_until(|| !source.is_listening());
        let times = times.lock();
        assert_eq!(times.len(), 5);
        assert!((times[0] - 2.0).abs() < 1e-12);
        assert!((times[4] - 2.4).abs() < 1e-9);
        assert_eq!(source.sent(), 5);
    }

    #[test]
    fn test_stop_ends_realtime_source() {
        let source = MockSensorSource::new(
            "cam",
            MockSensorConfig {
                frequency_hz: 200.0,
                ..Default::default()
            },
        );
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        source.listen(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));

        wait_until(|| count.load(Ordering::Relaxed) > 0);
        source.stop();
        assert!(!source.is_listening());
        assert!(count.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn test_idempotent_listen_and_trigger() {
        let source = MockSensorSource::manual("manual");
        assert!(!source.trigger(RawSample {
            payload: Bytes::new(),
            capture_time_s: 0.0,
        }));

        let count = Arc::new(AtomicU64::new(0));
        let first = Arc::clone(&count);
        let second = Arc::clone(&count);
        source.listen(Arc::new(move |_| {
            first.fetch_add(1, Ordering::Relaxed);
        }));
        // second registration ignored
        source.listen(Arc::new(move |_| {
            second.fetch_add(100, Ordering::Relaxed);
        }));

        assert!(source.trigger(RawSample {
            payload: Bytes::from_static(b"x"),
            capture_time_s: 0.0,
        }));
        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert!(source.is_listening());
    }
}

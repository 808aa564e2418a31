//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置加载到评估器的装配
//! - 传感器 -> 闸门 -> 流 的数据路径
//! - 评估器 -> Dispatcher -> CSV 的输出路径

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{PipelineConfig, ReportMode};

    #[test]
    fn test_empty_config_matches_defaults() {
        let loaded = ConfigLoader::load_from_str("", ConfigFormat::Toml).unwrap();
        let defaults = PipelineConfig::default();

        assert_eq!(loaded.decay.max_latency_ms, defaults.decay.max_latency_ms);
        assert_eq!(loaded.decay.iou_thresholds, defaults.decay.iou_thresholds);
        assert_eq!(
            loaded.prediction.num_future_steps,
            defaults.prediction.num_future_steps
        );
        assert_eq!(loaded.prediction.report_mode, ReportMode::PerWatermark);
        assert!(loaded.sinks.is_empty());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        stream, BoundingBox2D, Obstacle, ObstaclePrediction, ObstacleTrajectory, Pose, RawSample,
        SinkConfig, SinkType, StreamMessage, TimestampKey, Transform, Vector3,
    };
    use dispatcher::{create_dispatcher, row_callback};
    use evaluation::{DetectionDecayEvaluator, EvaluationPipeline, EvaluatorState};
    use ingestion::{GatedSensorDriver, MockSensorConfig, MockSensorSource};
    use sync_engine::{OfferOutcome, ReleaseGate, ReleaseOutcome, SyncError};
    use tokio::sync::mpsc;

    fn sample(capture_time_s: f64) -> RawSample {
        RawSample {
            payload: Bytes::from_static(b"frame"),
            capture_time_s,
        }
    }

    /// MockSensorSource -> GatedSensorDriver -> ReleaseGate -> streams
    ///
    /// 验证：
    /// 1. 闸门模式下只有 watermark 出现在 secondary 流
    /// 2. release 之后数据与 watermark 出现在 primary 流
    /// 3. 释放 top 后后续样本直接转发
    #[test]
    fn test_e2e_gated_sensor_release() {
        observability::init_for_tests();
        let (primary_tx, primary_rx) = stream::<Bytes>("camera", 16);
        let (secondary_tx, secondary_rx) = stream::<Bytes>("camera_watermarks", 16);
        let gate = Arc::new(ReleaseGate::new(
            "camera",
            Arc::new(primary_tx),
            Arc::new(secondary_tx),
            false,
        ));

        let source = Arc::new(MockSensorSource::manual("camera"));
        let driver = GatedSensorDriver::raw(source.clone(), Arc::clone(&gate));
        driver.start();

        assert!(source.trigger(sample(0.25)));
        assert!(source.trigger(sample(0.5)));
        assert!(driver.take_failures().is_empty());

        assert!(primary_rx.is_empty());
        let watermarks: Vec<_> = secondary_rx
            .drain()
            .into_iter()
            .map(|m| m.key().clone())
            .collect();
        assert_eq!(
            watermarks,
            vec![TimestampKey::from_millis(250), TimestampKey::from_millis(500)]
        );

        assert_eq!(
            driver.on_release(TimestampKey::from_millis(500)).unwrap(),
            ReleaseOutcome::Emitted
        );
        let released = primary_rx.drain();
        assert_eq!(released.len(), 2);
        assert!(matches!(
            &released[0],
            StreamMessage::Data { key, payload } if *key == TimestampKey::from_millis(500) && payload[..] == b"frame"[..]
        ));
        assert!(released[1].is_watermark());

        // 未释放的样本由调用方丢弃
        assert!(driver.discard(&TimestampKey::from_millis(250)).is_ok());
        assert!(matches!(
            driver.on_release(TimestampKey::from_millis(250)),
            Err(ingestion::IngestionError::Sync(SyncError::MissingSnapshot { .. }))
        ));

        assert_eq!(
            driver.on_release(TimestampKey::Top).unwrap(),
            ReleaseOutcome::SwitchedToImmediate
        );
        assert_eq!(driver.handle_sample(sample(0.75)).unwrap(), OfferOutcome::Forwarded);
        assert_eq!(primary_rx.drain().len(), 2);
        assert_eq!(gate.pending_len(), 0);

        driver.stop();
    }

    /// 后台线程驱动的 mock 传感器，全部样本经立即模式闸门到达
    #[test]
    fn test_e2e_background_sensor() {
        observability::init_for_tests();
        let (primary_tx, primary_rx) = stream::<Bytes>("lidar", 64);
        let (secondary_tx, _secondary_rx) = stream::<Bytes>("lidar_watermarks", 64);
        let gate = Arc::new(ReleaseGate::new(
            "lidar",
            Arc::new(primary_tx),
            Arc::new(secondary_tx),
            true,
        ));

        let source = Arc::new(MockSensorSource::new(
            "lidar",
            MockSensorConfig {
                frequency_hz: 20.0,
                payload_size: 64,
                start_time_s: 1.0,
                max_samples: Some(5),
                realtime: false,
            },
        ));
        let driver = GatedSensorDriver::raw(source.clone(), gate);
        driver.start();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while source.sent() < 5 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        driver.stop();

        assert_eq!(source.sent(), 5);
        let data = primary_rx
            .drain()
            .into_iter()
            .filter(|m| !m.is_watermark())
            .count();
        assert_eq!(data, 5);
        assert!(driver.take_failures().is_empty());
    }

    fn stationary_person() -> (ObstacleTrajectory, ObstaclePrediction) {
        let points = vec![Transform::from_location(Vector3::new(3.0, 1.0, 0.0)); 2];
        (
            ObstacleTrajectory {
                id: 7,
                label: "person".to_string(),
                trajectory: points.clone(),
            },
            ObstaclePrediction {
                id: 7,
                label: "person".to_string(),
                probability: 0.9,
                predicted_trajectory: points,
            },
        )
    }

    /// Config -> EvaluationPipeline -> Dispatcher -> CsvSink
    #[tokio::test]
    async fn test_e2e_prediction_rows_to_csv() {
        observability::init_for_tests();
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("prediction.csv");
        let content = format!(
            r#"
[prediction]
num_future_steps = 2

[[sinks]]
name = "csv"
sink_type = "csv"
[sinks.params]
path = "{}"
"#,
            csv_path.display()
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();

        let (row_tx, row_rx) = mpsc::channel(256);
        let dispatcher = create_dispatcher(config.sinks.clone(), row_rx).unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let pipeline =
            EvaluationPipeline::new(&config.prediction, Some(row_callback(row_tx))).unwrap();

        for ms in [100u64, 200, 300] {
            let key = TimestampKey::from_millis(ms);
            let (tracking, prediction) = stationary_person();
            pipeline.push_pose(key.clone(), Pose::default()).unwrap();
            pipeline.push_tracking(key.clone(), vec![tracking]).unwrap();
            pipeline.push_predictions(key.clone(), vec![prediction]).unwrap();
            assert!(pipeline.on_watermark_all(key).unwrap().is_emitted());
        }

        assert_eq!(pipeline.state(), EvaluatorState::Scoring);
        assert_eq!(pipeline.score_passes(), 2);

        // Dropping the pipeline drops the row callback and closes the input
        drop(pipeline);
        let metrics = dispatcher_handle.await.unwrap();
        assert_eq!(metrics[0].1.rows_written, 12);
        assert_eq!(metrics[0].1.rows_dropped, 0);

        let written = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 12);
        for line in &lines {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 5);
            assert_eq!(fields[2], "prediction");
            assert_eq!(fields[4], "0.0000");
        }
        assert!(lines[0].contains(",200,prediction,MSD,"));
        assert!(lines.iter().any(|l| l.contains(",300,prediction,person-FDE,")));
        assert!(!lines.iter().any(|l| l.contains("vehicle-")));
    }

    /// DetectionDecayEvaluator rows through the dispatcher
    #[tokio::test]
    async fn test_e2e_decay_rows() {
        observability::init_for_tests();
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("decay.csv");
        let mut config = ConfigLoader::load_from_str(
            "[decay]\nmax_latency_ms = 100\nclass = \"vehicle\"\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        let mut params = HashMap::new();
        params.insert("path".to_string(), csv_path.display().to_string());
        config.sinks = vec![
            SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 16,
                params: HashMap::new(),
            },
            SinkConfig {
                name: "csv".to_string(),
                sink_type: SinkType::Csv,
                queue_capacity: 16,
                params,
            },
        ];

        let (row_tx, row_rx) = mpsc::channel(64);
        let dispatcher_handle = create_dispatcher(config.sinks.clone(), row_rx)
            .unwrap()
            .spawn();

        let evaluator =
            DetectionDecayEvaluator::new(&config.decay).with_row_callback(row_callback(row_tx));
        let frame = vec![
            Obstacle::new(1, "car", BoundingBox2D::new(0.0, 0.0, 10.0, 10.0)),
            Obstacle::new(2, "person", BoundingBox2D::new(20.0, 20.0, 30.0, 30.0)),
        ];

        let mut total = 0;
        for ms in [0u64, 50, 120, 260] {
            total += evaluator
                .on_detections(TimestampKey::from_millis(ms), &frame)
                .unwrap()
                .len();
        }
        assert_eq!(total, 2);
        assert_eq!(evaluator.retained(), 1);
        assert_eq!(evaluator.precision_stats().mean(), 1.0);

        drop(evaluator);
        let metrics = dispatcher_handle.await.unwrap();
        assert!(metrics.iter().all(|(_, m)| m.rows_written == 2));

        let written = std::fs::read_to_string(&csv_path).unwrap();
        let scopes: Vec<&str> = written
            .lines()
            .map(|l| l.split(',').nth(3).unwrap())
            .collect();
        assert_eq!(scopes, vec!["50", "70"]);
    }
}

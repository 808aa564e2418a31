//! DataSink - 指标行输出接口

use crate::{ContractError, MetricRow};

/// 指标行的落地端
///
/// 由 dispatcher 在独立 worker 中驱动，同一实例只会被顺序调用。
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// 用于日志和指标的名称
    fn name(&self) -> &str;

    /// 写入一行；失败只影响这一行
    async fn write(&mut self, row: &MetricRow) -> Result<(), ContractError>;

    async fn flush(&mut self) -> Result<(), ContractError>;

    /// worker 退出前调用一次 (在 flush 之后)
    async fn close(&mut self) -> Result<(), ContractError>;
}

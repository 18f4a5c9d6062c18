//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 调度队列不变量（每个活跃通道恰好一个条目）
//! - 录制控制器：开始/停止/转储/按名转储
//! - 调度与转储并发时的 Record 跳过
//! - 配置启动与事件源端到端流程

#[cfg(test)]
mod support;

#[cfg(test)]
mod scheduling_tests;

#[cfg(test)]
mod recording_tests;

#[cfg(test)]
mod contention_tests;

#[cfg(test)]
mod boot_tests;

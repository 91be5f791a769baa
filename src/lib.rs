//! Graylog 日志检索 MCP 工具核心库
//! 客户端、归一化、工具处理与传输层分模块实现，便于独立测试。

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod model;
pub mod normalize;
pub mod tools;

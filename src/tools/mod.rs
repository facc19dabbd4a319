//! 工具箱：数据查询与图表校验，以及按名注册/分发的注册表

pub mod chart;
pub mod dataset;
pub mod query;
pub mod registry;

pub use chart::{parse_chart_spec, CreateChartTool};
pub use dataset::MovieFrame;
pub use query::QueryMovieDbTool;
pub use registry::{Tool, ToolRegistry};

//! 数据查询工具
//!
//! 在内存电影表上执行查询表达式（语法见 dataset 模块）；参数严格按 schema 解码，
//! 解码失败报 ArgumentDecode，求值失败报 ToolExecutionFailed。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

use crate::core::AgentError;
use crate::tools::dataset::MovieFrame;
use crate::tools::Tool;

/// QueryMovieDb 参数
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct QueryArgs {
    /// 查询表达式，如 `year >= 2020 | mean(rating)`
    query: String,
}

/// 电影数据库查询工具
pub struct QueryMovieDbTool {
    frame: Arc<MovieFrame>,
}

impl QueryMovieDbTool {
    pub const NAME: &'static str = "QueryMovieDb";

    pub fn new(frame: Arc<MovieFrame>) -> Self {
        Self { frame }
    }
}

#[async_trait]
impl Tool for QueryMovieDbTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Runs a query expression on the movie database (columns: title, year, genre, rating) \
         and returns the computed result. Syntax: zero or more `column op literal` filters \
         piped into one aggregation, e.g. `year >= 2020 | mean(rating)`. Aggregations: \
         count(), mean(col), min(col), max(col), sum(col), top(n, col), columns()."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schema_for!(QueryArgs)).unwrap_or_else(|_| Value::Null)
    }

    /// 审批界面只展示查询表达式本身
    fn render_input(&self, args: &Value) -> String {
        args.get("query")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| args.to_string())
    }

    async fn execute(&self, args: Value) -> Result<String, AgentError> {
        let args: QueryArgs =
            serde_json::from_value(args).map_err(|e| AgentError::ArgumentDecode(e.to_string()))?;
        self.frame
            .evaluate(&args.query)
            .map_err(AgentError::ToolExecutionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> QueryMovieDbTool {
        QueryMovieDbTool::new(Arc::new(MovieFrame::builtin_sample()))
    }

    #[tokio::test]
    async fn test_executes_query() {
        let out = tool()
            .execute(serde_json::json!({"query": "count()"}))
            .await
            .unwrap();
        assert_eq!(out, "count = 12");
    }

    #[tokio::test]
    async fn test_strict_argument_decode() {
        let err = tool()
            .execute(serde_json::json!({"code": "count()"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ArgumentDecode(_)));
        assert!(err.to_string().starts_with("Invalid arguments:"));
    }

    #[tokio::test]
    async fn test_evaluation_failure_is_typed() {
        let err = tool()
            .execute(serde_json::json!({"query": "mean(title)"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolExecutionFailed(_)));
    }

    #[test]
    fn test_render_input_shows_query() {
        let repr = tool().render_input(&serde_json::json!({"query": "mean(rating)"}));
        assert_eq!(repr, "mean(rating)");
    }
}

//! 图表工具
//!
//! 校验 Vega-Lite spec 字符串：须为 JSON 对象且带 mark 与 encoding。
//! 校验通过的 spec 由状态机加入图表列表；回溯后 derive_chart_specs 用同一
//! parse_chart_spec 对幸存 Chart 事件重新校验。

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

use crate::core::AgentError;
use crate::tools::Tool;

/// CreateChart 参数
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct ChartArgs {
    /// Vega-Lite 可视化 spec（JSON 字符串）
    vega_lite_spec: String,
}

/// 校验 spec 字符串，成功返回解析后的 JSON 对象
pub fn parse_chart_spec(spec_str: &str) -> Result<Value, String> {
    let spec: Value =
        serde_json::from_str(spec_str).map_err(|e| format!("spec is not valid JSON: {e}"))?;
    let obj = spec
        .as_object()
        .ok_or_else(|| "spec must be a JSON object".to_string())?;
    for key in ["mark", "encoding"] {
        if !obj.contains_key(key) {
            return Err(format!("spec is missing required field '{key}'"));
        }
    }
    Ok(spec)
}

/// Vega-Lite 图表工具
pub struct CreateChartTool;

impl CreateChartTool {
    pub const NAME: &'static str = "CreateChart";
}

#[async_trait]
impl Tool for CreateChartTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Creates a Vega-Lite chart visualization from the data. Pass the full Vega-Lite \
         specification as a JSON string; it must contain \"mark\" and \"encoding\"."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schema_for!(ChartArgs)).unwrap_or_else(|_| Value::Null)
    }

    fn renders_chart(&self) -> bool {
        true
    }

    /// 审批界面只展示 spec 字符串本身
    fn render_input(&self, args: &Value) -> String {
        args.get("vega_lite_spec")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| args.to_string())
    }

    async fn execute(&self, args: Value) -> Result<String, AgentError> {
        let args: ChartArgs =
            serde_json::from_value(args).map_err(|e| AgentError::ArgumentDecode(e.to_string()))?;
        let spec = parse_chart_spec(&args.vega_lite_spec).map_err(AgentError::ToolExecutionFailed)?;
        let mark = spec
            .get("mark")
            .map(|m| m.to_string())
            .unwrap_or_else(|| "?".to_string());
        Ok(format!("Chart specification is valid (mark: {mark}). Chart added to output."))
    }
}

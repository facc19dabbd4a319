//! 端到端运行测试：通过 RunController 驱动完整的审批/拒绝/编辑/回溯场景

use std::sync::Arc;

use heron::core::AgentPhase;
use heron::llm::MockModelClient;
use heron::run::{AgentEvent, HumanDecision, RunController, TickOutcome, ToolCallRequest};
use heron::tools::{CreateChartTool, MovieFrame, QueryMovieDbTool, ToolRegistry};

fn tools(with_chart: bool) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(QueryMovieDbTool::new(Arc::new(MovieFrame::builtin_sample())));
    if with_chart {
        registry.register(CreateChartTool);
    }
    Arc::new(registry)
}

fn query_call(query: &str) -> ToolCallRequest {
    ToolCallRequest::new(QueryMovieDbTool::NAME, serde_json::json!({ "query": query }))
}

const VALID_SPEC: &str =
    r#"{"mark": "bar", "encoding": {"x": {"field": "genre"}, "y": {"field": "rating"}}}"#;

#[tokio::test]
async fn test_full_question_to_answer_flow() {
    let model = Arc::new(
        MockModelClient::new()
            .with_decision("I need to compute the mean rating", true, None)
            .with_proposal(vec![query_call("mean(rating)")])
            .with_decision("I have the result", false, Some("The average rating is 7.33")),
    );
    let mut controller = RunController::new(model);
    controller.start("average rating?", tools(false));

    // 自动推进到审批悬停点
    assert_eq!(controller.drive().await.unwrap(), TickOutcome::WaitHuman);
    assert_eq!(
        *controller.run().unwrap().phase(),
        AgentPhase::AwaitingApproval
    );
    assert_eq!(controller.run().unwrap().pending_view().len(), 1);

    // 批准后继续推进到 Done
    controller.apply(HumanDecision::Approve).await.unwrap();
    assert_eq!(controller.drive().await.unwrap(), TickOutcome::Stopped);

    let run = controller.run().unwrap();
    assert_eq!(*run.phase(), AgentPhase::Done);
    match run.events().last().unwrap() {
        AgentEvent::Answer { text } => assert_eq!(text, "The average rating is 7.33"),
        other => panic!("expected Answer, got {other:?}"),
    }
    // 事件序列：Thought, Action, Answer
    assert_eq!(run.events().len(), 3);
    match &run.events()[1] {
        AgentEvent::Action { output_text, .. } => {
            assert!(output_text.starts_with("mean(rating) = "))
        }
        other => panic!("expected Action, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reject_then_different_approach() {
    let model = Arc::new(
        MockModelClient::new()
            .with_decision("try a slow full scan", true, None)
            .with_proposal(vec![query_call("top(12, rating)")])
            .with_decision("use the aggregate instead", true, None)
            .with_proposal(vec![query_call("mean(rating)")])
            .with_decision("done", false, Some("7.33")),
    );
    let mut controller = RunController::new(model);
    controller.start("average rating?", tools(false));
    controller.drive().await.unwrap();

    controller
        .apply(HumanDecision::RequestReject)
        .await
        .unwrap();
    assert_eq!(
        *controller.run().unwrap().phase(),
        AgentPhase::AwaitingFeedback
    );
    controller
        .apply(HumanDecision::SubmitFeedback("too slow".to_string()))
        .await
        .unwrap();
    controller.drive().await.unwrap();

    // 第二个提议等待审批；拒绝事件带反馈
    let run = controller.run().unwrap();
    assert_eq!(*run.phase(), AgentPhase::AwaitingApproval);
    let rejected: Vec<_> = run
        .events()
        .iter()
        .filter(|e| matches!(e, AgentEvent::Rejected { feedback, .. } if feedback == "too slow"))
        .collect();
    assert_eq!(rejected.len(), 1);

    controller.apply(HumanDecision::Approve).await.unwrap();
    controller.drive().await.unwrap();
    assert_eq!(controller.run().unwrap().answer(), Some("7.33"));
}

#[tokio::test]
async fn test_edit_pending_proposal_flow() {
    let model = Arc::new(
        MockModelClient::new()
            .with_decision("query all years", true, None)
            .with_proposal(vec![query_call("mean(rating)")])
            .with_proposal(vec![query_call("year >= 2020 | mean(rating)")])
            .with_decision("done", false, Some("recent mean is 7.73")),
    );
    let mut controller = RunController::new(model);
    controller.start("average rating of recent movies?", tools(false));
    controller.drive().await.unwrap();

    controller.apply(HumanDecision::RequestEdit).await.unwrap();
    controller
        .apply(HumanDecision::SubmitEdit("filter to 2020+".to_string()))
        .await
        .unwrap();
    controller.drive().await.unwrap();

    let run = controller.run().unwrap();
    assert_eq!(*run.phase(), AgentPhase::AwaitingApproval);
    assert_eq!(run.pending_view()[0].input_repr, "year >= 2020 | mean(rating)");
    // 编辑指令出现在新提议之前的转录轮次里
    assert!(run
        .transcript()
        .iter()
        .any(|t| t.content.contains("filter to 2020+")));

    controller.apply(HumanDecision::Approve).await.unwrap();
    controller.drive().await.unwrap();
    assert_eq!(*controller.run().unwrap().phase(), AgentPhase::Done);
}

#[tokio::test]
async fn test_rewind_replay_reproduces_event_prefix() {
    // 第一轮：提问到 Done；回溯后用同样的提议重放，事件前缀必须一致
    let model = Arc::new(
        MockModelClient::new()
            .with_decision("compute the mean", true, None)
            .with_proposal(vec![query_call("mean(rating)")])
            .with_decision("done", false, Some("7.33"))
            // 回溯后的重放脚本
            .with_proposal(vec![query_call("mean(rating)")])
            .with_decision("done again", false, Some("7.33")),
    );
    let mut controller = RunController::new(model);
    controller.start("average rating?", tools(false));
    controller.drive().await.unwrap();
    controller.apply(HumanDecision::Approve).await.unwrap();
    controller.drive().await.unwrap();

    let (first_input, first_output) = match &controller.run().unwrap().events()[1] {
        AgentEvent::Action {
            input_repr,
            output_text,
            ..
        } => (input_repr.clone(), output_text.clone()),
        other => panic!("expected Action, got {other:?}"),
    };
    let first_thought = format!("{:?}", controller.run().unwrap().events()[0]);

    // 回溯到 Action（索引 1）并用同样的输入重放
    controller
        .apply(HumanDecision::SelectRewind(1))
        .await
        .unwrap();
    controller
        .apply(HumanDecision::SubmitEdit("same as before".to_string()))
        .await
        .unwrap();
    controller.drive().await.unwrap();
    controller.apply(HumanDecision::Approve).await.unwrap();
    controller.drive().await.unwrap();

    let run = controller.run().unwrap();
    assert_eq!(*run.phase(), AgentPhase::Done);
    // 回溯点之前的事件前缀原样保留
    assert_eq!(format!("{:?}", run.events()[0]), first_thought);
    assert!(matches!(run.events()[1], AgentEvent::Edited { .. }));
    // 同样的输入重放产生同样的观察
    match &run.events()[2] {
        AgentEvent::Action {
            input_repr,
            output_text,
            ..
        } => {
            assert_eq!(*input_repr, first_input);
            assert_eq!(*output_text, first_output);
        }
        other => panic!("expected Action, got {other:?}"),
    }
    assert_eq!(run.answer(), Some("7.33"));
}

#[tokio::test]
async fn test_chart_run_and_rewind_keeps_chart_list_consistent() {
    let model = Arc::new(
        MockModelClient::new()
            .with_decision("compute data", true, None)
            .with_proposal(vec![query_call("genre == \"Drama\" | mean(rating)")])
            .with_decision("now chart it", true, None)
            .with_proposal(vec![ToolCallRequest::new(
                CreateChartTool::NAME,
                serde_json::json!({ "vega_lite_spec": VALID_SPEC }),
            )])
            .with_decision("done", false, Some("see the chart"))
            // 回溯图表后的重放：空提议直接结束
            .with_proposal(vec![]),
    );
    let mut controller = RunController::new(model);
    controller.start("chart drama ratings", tools(true));

    for _ in 0..2 {
        controller.drive().await.unwrap();
        controller.apply(HumanDecision::Approve).await.unwrap();
    }
    controller.drive().await.unwrap();
    assert_eq!(*controller.run().unwrap().phase(), AgentPhase::Done);
    assert_eq!(controller.run().unwrap().chart_specs().len(), 1);

    // 回溯到 Chart 事件（索引 3）：图表列表随幸存事件重新推导为空
    controller
        .apply(HumanDecision::SelectRewind(3))
        .await
        .unwrap();
    controller
        .apply(HumanDecision::SubmitEdit("use a line mark".to_string()))
        .await
        .unwrap();
    assert!(controller.run().unwrap().chart_specs().is_empty());

    // 空提议：运行结束且无 Answer 事件
    controller.drive().await.unwrap();
    let run = controller.run().unwrap();
    assert_eq!(*run.phase(), AgentPhase::Done);
    assert_eq!(run.answer(), None);
}

#[tokio::test]
async fn test_cancel_rewind_edit_restores_done() {
    let model = Arc::new(
        MockModelClient::new()
            .with_decision("query", true, None)
            .with_proposal(vec![query_call("count()")])
            .with_decision("done", false, Some("12 movies")),
    );
    let mut controller = RunController::new(model);
    controller.start("how many movies?", tools(false));
    controller.drive().await.unwrap();
    controller.apply(HumanDecision::Approve).await.unwrap();
    controller.drive().await.unwrap();

    controller
        .apply(HumanDecision::SelectRewind(1))
        .await
        .unwrap();
    assert_eq!(*controller.run().unwrap().phase(), AgentPhase::AwaitingEdit);
    controller.apply(HumanDecision::CancelEdit).await.unwrap();

    let run = controller.run().unwrap();
    assert_eq!(*run.phase(), AgentPhase::Done);
    assert_eq!(run.answer(), Some("12 movies"));
    assert_eq!(run.events().len(), 3);
}

#[tokio::test]
async fn test_model_failure_is_retryable() {
    // 脚本只有一条决策，第二次 thinking 将失败
    let model = Arc::new(
        MockModelClient::new()
            .with_decision("query", true, None)
            .with_proposal(vec![query_call("count()")]),
    );
    let mut controller = RunController::new(model);
    controller.start("q", tools(false));
    controller.drive().await.unwrap();
    controller.apply(HumanDecision::Approve).await.unwrap();

    // 批准后的 thinking：脚本耗尽，模型调用失败但相位保持可重试
    assert!(controller.drive().await.is_err());
    assert_eq!(*controller.run().unwrap().phase(), AgentPhase::Thinking);
    // 事件与观察完好：Thought + Action
    assert_eq!(controller.run().unwrap().events().len(), 2);
}

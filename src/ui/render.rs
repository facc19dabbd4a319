//! 界面渲染
//!
//! 上方为过程事件轨迹（思考/动作+观察/拒绝/编辑/回答，按类型着色，宽度换行），
//! 中部为阶段相关提示（待审批调用、编辑/反馈指引、回答与图表），底部为输入框。

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::core::{AgentPhase, UiState};
use crate::run::AgentEvent;

/// 观察文本显示上限；过长内容折叠避免刷屏
const MAX_OUTPUT_DISPLAY_CHARS: usize = 400;

/// 对过长内容做折叠：保留前 N 字 + 省略提示
fn truncate_for_display(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= MAX_OUTPUT_DISPLAY_CHARS {
        return content.to_string();
    }
    let head: String = chars.iter().take(MAX_OUTPUT_DISPLAY_CHARS).collect();
    format!("{}\n... [{} chars total]", head, chars.len())
}

/// 将内容按宽度换行（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn phase_label(phase: &AgentPhase) -> &'static str {
    match phase {
        AgentPhase::Idle => "idle",
        AgentPhase::Thinking => "thinking...",
        AgentPhase::Acting => "acting...",
        AgentPhase::AwaitingApproval => "awaiting approval",
        AgentPhase::AwaitingEdit => "awaiting edit",
        AgentPhase::AwaitingFeedback => "awaiting feedback",
        AgentPhase::Done => "done",
    }
}

/// 单条事件渲染为着色行；selected 为 Done 阶段当前高亮的回溯目标
fn event_lines(index: usize, event: &AgentEvent, width: usize, selected: Option<usize>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let tag_style = |color: Color| Style::default().fg(color).add_modifier(Modifier::BOLD);
    let highlight = selected == Some(index);

    let mut push_block = |tag: &str, color: Color, body: &str| {
        let mut header = vec![Span::styled(format!("{tag} "), tag_style(color))];
        if highlight {
            header.push(Span::styled(
                "< rewind target >",
                Style::default().fg(Color::Black).bg(Color::Yellow),
            ));
        }
        lines.push(Line::from(header));
        for l in wrap_text(body, width) {
            lines.push(Line::from(Span::raw(format!("  {l}"))));
        }
    };

    match event {
        AgentEvent::Thought { text } => push_block("Thought:", Color::Cyan, text),
        AgentEvent::Action {
            tool_name,
            input_repr,
            output_text,
            ..
        } => {
            push_block(&format!("Action: {tool_name}"), Color::Yellow, input_repr);
            push_block("Observation:", Color::Gray, &truncate_for_display(output_text));
        }
        AgentEvent::Chart {
            tool_name,
            input_repr,
            output_text,
            ..
        } => {
            push_block(&format!("Chart: {tool_name}"), Color::Magenta, input_repr);
            push_block("Observation:", Color::Gray, &truncate_for_display(output_text));
        }
        AgentEvent::Rejected { tool_name, feedback } => {
            let body = if feedback.is_empty() {
                "(no feedback)".to_string()
            } else {
                format!("feedback: {feedback}")
            };
            push_block(&format!("Rejected: {tool_name}"), Color::Red, &body);
        }
        AgentEvent::Edited { prompt } => push_block("Edit:", Color::Blue, prompt),
        AgentEvent::Answer { text } => push_block("Answer:", Color::Green, text),
    }
    lines.push(Line::from(""));
    lines
}

/// 阶段相关的提示区内容
fn prompt_lines(state: &UiState, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let hint = Style::default().fg(Color::DarkGray);

    if let Some(err) = &state.error_message {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    match state.phase {
        AgentPhase::Idle => {
            lines.push(Line::from(Span::styled(
                "Enter a question about the movie database to start.",
                hint,
            )));
        }
        AgentPhase::Thinking | AgentPhase::Acting => {
            if state.error_message.is_some() {
                lines.push(Line::from(Span::styled("[r] retry", hint)));
            } else {
                lines.push(Line::from(Span::styled("Agent is working...", hint)));
            }
        }
        AgentPhase::AwaitingApproval => {
            lines.push(Line::from(Span::styled(
                "The agent wants to perform the following action:",
                Style::default().fg(Color::Yellow),
            )));
            if let Some(thought) = &state.latest_thought {
                for l in wrap_text(&format!("Intent: {thought}"), width) {
                    lines.push(Line::from(Span::raw(l)));
                }
            }
            for call in &state.pending {
                lines.push(Line::from(Span::styled(
                    format!("Tool: {} — {}", call.tool_name, call.description),
                    Style::default().fg(Color::Yellow),
                )));
                for l in wrap_text(&call.input_repr, width) {
                    lines.push(Line::from(Span::raw(format!("  {l}"))));
                }
            }
            lines.push(Line::from(Span::styled(
                "[a] approve   [e] edit   [r] reject",
                hint,
            )));
        }
        AgentPhase::AwaitingEdit => {
            lines.push(Line::from(Span::styled(
                "Describe how you want the input changed; the agent will regenerate it.",
                hint,
            )));
            lines.push(Line::from(Span::styled("[Enter] submit   [Esc] cancel", hint)));
        }
        AgentPhase::AwaitingFeedback => {
            lines.push(Line::from(Span::styled(
                "Why are you rejecting? Tell the agent what to do instead (may be empty).",
                hint,
            )));
            lines.push(Line::from(Span::styled("[Enter] submit", hint)));
        }
        AgentPhase::Done => {
            if let Some(answer) = &state.answer {
                for l in wrap_text(&format!("Answer: {answer}"), width) {
                    lines.push(Line::from(Span::styled(
                        l,
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    )));
                }
            } else {
                lines.push(Line::from(Span::styled(
                    "Run ended without an explicit answer.",
                    hint,
                )));
            }
            if !state.chart_specs.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("{} chart spec(s) produced.", state.chart_specs.len()),
                    Style::default().fg(Color::Magenta),
                )));
            }
            lines.push(Line::from(Span::styled(
                "[←/→] pick an action to rewind, [Enter] edit it — or type a new question",
                hint,
            )));
        }
    }
    lines
}

/// 绘制一帧：轨迹区 + 提示区 + 输入区；将 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
#[allow(clippy::too_many_arguments)]
pub fn draw(
    f: &mut Frame,
    state: &UiState,
    input_buffer: &str,
    chart_mode: bool,
    rewind_selection: Option<usize>,
    trace_scroll: usize,
    out: &mut (usize, usize),
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(9),
            Constraint::Length(3),
        ])
        .split(f.area());

    let width = chunks[0].width.saturating_sub(2) as usize;

    // 轨迹区
    let mut trace: Vec<Line> = Vec::new();
    for (i, event) in state.events.iter().enumerate() {
        trace.extend(event_lines(i, event, width, rewind_selection));
    }
    let total_lines = trace.len();
    let viewport = chunks[0].height.saturating_sub(2) as usize;
    *out = (total_lines, viewport);
    let scroll = trace_scroll.min(total_lines.saturating_sub(viewport)) as u16;

    let title = format!(" Heron — {} ", phase_label(&state.phase));
    f.render_widget(
        Paragraph::new(trace)
            .block(Block::default().borders(Borders::ALL).title(title))
            .scroll((scroll, 0)),
        chunks[0],
    );

    // 提示区
    f.render_widget(
        Paragraph::new(prompt_lines(state, width))
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL)),
        chunks[1],
    );

    // 输入区
    let input_title = if chart_mode {
        " Question (chart: on, Ctrl+T to toggle) "
    } else {
        " Question (chart: off, Ctrl+T to toggle) "
    };
    f.render_widget(
        Paragraph::new(input_buffer.to_string())
            .block(Block::default().borders(Borders::ALL).title(input_title)),
        chunks[2],
    );
}

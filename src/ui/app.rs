//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx 与键盘事件；按键按当前阶段解释：
//! 审批热键（a/e/r）、编辑/反馈输入、Done 阶段的回溯目标选择与新问题提交。

use std::io::{self, Stdout};

use crossterm::event::KeyCode;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

use crate::core::{AgentPhase, Command, UiState};
use crate::run::HumanDecision;
use crate::ui::render::draw;

/// 可作为回溯目标的事件索引（Action/Chart）
fn rewindable_indices(state: &UiState) -> Vec<usize> {
    state
        .events
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.rewind_point().map(|_| i))
        .collect()
}

/// 在候选里取当前选择的前/后一个
fn step_selection(candidates: &[usize], current: Option<usize>, forward: bool) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    let pos = current.and_then(|c| candidates.iter().position(|&i| i == c));
    let next = match (pos, forward) {
        (None, _) => 0,
        (Some(p), true) => (p + 1).min(candidates.len() - 1),
        (Some(p), false) => p.saturating_sub(1),
    };
    Some(candidates[next])
}

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    state_rx: watch::Receiver<UiState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let event_handler = super::event::EventHandler::new(cmd_tx);
    let mut input_buffer = String::new();
    let mut chart_mode = false;
    let mut rewind_selection: Option<usize> = None;
    let mut trace_scroll = 0usize;
    let mut last_events_len = 0usize;

    loop {
        let state = state_rx.borrow().clone();

        if state.events.len() != last_events_len {
            last_events_len = state.events.len();
            trace_scroll = usize::MAX; // 新事件：贴到底部
        }
        if state.phase != AgentPhase::Done {
            rewind_selection = None;
        }

        if let Ok(Some(ev)) = event_handler.poll() {
            match ev {
                super::event::AppEvent::Command(Command::Quit) => {
                    event_handler.send_quit();
                    break;
                }
                super::event::AppEvent::Command(_) => {}
                super::event::AppEvent::Key(key) => {
                    let ctrl = key
                        .modifiers
                        .contains(crossterm::event::KeyModifiers::CONTROL);
                    match key.code {
                        KeyCode::Char('t') if ctrl => {
                            chart_mode = !chart_mode;
                        }
                        KeyCode::Up => trace_scroll = trace_scroll.saturating_sub(1),
                        KeyCode::Down => trace_scroll = trace_scroll.saturating_add(1),
                        KeyCode::PageUp => trace_scroll = trace_scroll.saturating_sub(10),
                        KeyCode::PageDown => trace_scroll = trace_scroll.saturating_add(10),
                        _ => match state.phase {
                            AgentPhase::Thinking | AgentPhase::Acting => {
                                if state.error_message.is_some() && key.code == KeyCode::Char('r') {
                                    event_handler.send_retry();
                                }
                            }
                            AgentPhase::AwaitingApproval => match key.code {
                                KeyCode::Char('a') => {
                                    event_handler.send_decide(HumanDecision::Approve)
                                }
                                KeyCode::Char('e') => {
                                    event_handler.send_decide(HumanDecision::RequestEdit)
                                }
                                KeyCode::Char('r') => {
                                    event_handler.send_decide(HumanDecision::RequestReject)
                                }
                                _ => {}
                            },
                            AgentPhase::AwaitingEdit => match key.code {
                                KeyCode::Enter => {
                                    let prompt = input_buffer.trim().to_string();
                                    if !prompt.is_empty() {
                                        input_buffer.clear();
                                        event_handler
                                            .send_decide(HumanDecision::SubmitEdit(prompt));
                                    }
                                }
                                KeyCode::Esc => {
                                    input_buffer.clear();
                                    event_handler.send_decide(HumanDecision::CancelEdit);
                                }
                                KeyCode::Backspace => {
                                    input_buffer.pop();
                                }
                                KeyCode::Char(c) => input_buffer.push(c),
                                _ => {}
                            },
                            AgentPhase::AwaitingFeedback => match key.code {
                                KeyCode::Enter => {
                                    let feedback = input_buffer.trim().to_string();
                                    input_buffer.clear();
                                    event_handler
                                        .send_decide(HumanDecision::SubmitFeedback(feedback));
                                }
                                KeyCode::Backspace => {
                                    input_buffer.pop();
                                }
                                KeyCode::Char(c) => input_buffer.push(c),
                                _ => {}
                            },
                            AgentPhase::Idle | AgentPhase::Done => match key.code {
                                KeyCode::Enter => {
                                    let input = input_buffer.trim().to_string();
                                    if !input.is_empty() {
                                        input_buffer.clear();
                                        if matches!(
                                            input.to_lowercase().as_str(),
                                            "/exit" | "exit" | "/quit" | "quit"
                                        ) {
                                            event_handler.send_quit();
                                            break;
                                        }
                                        event_handler.send_ask(input, chart_mode);
                                    } else if let Some(index) = rewind_selection.take() {
                                        event_handler
                                            .send_decide(HumanDecision::SelectRewind(index));
                                    }
                                }
                                KeyCode::Left => {
                                    rewind_selection = step_selection(
                                        &rewindable_indices(&state),
                                        rewind_selection,
                                        false,
                                    );
                                }
                                KeyCode::Right => {
                                    rewind_selection = step_selection(
                                        &rewindable_indices(&state),
                                        rewind_selection,
                                        true,
                                    );
                                }
                                KeyCode::Backspace => {
                                    input_buffer.pop();
                                }
                                KeyCode::Char(c) => input_buffer.push(c),
                                _ => {}
                            },
                        },
                    }
                }
            }
        }

        let mut scroll_info = (0usize, 0usize);
        terminal.draw(|f| {
            draw(
                f,
                &state,
                &input_buffer,
                chart_mode,
                rewind_selection,
                trace_scroll,
                &mut scroll_info,
            );
        })?;
        let (total_lines, viewport_height) = scroll_info;
        trace_scroll = trace_scroll.min(total_lines.saturating_sub(viewport_height));

        tokio::task::yield_now().await;
    }

    restore_terminal(&mut terminal)?;
    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_selection_cycles_candidates() {
        let candidates = vec![1, 3, 5];
        assert_eq!(step_selection(&candidates, None, true), Some(1));
        assert_eq!(step_selection(&candidates, Some(1), true), Some(3));
        assert_eq!(step_selection(&candidates, Some(5), true), Some(5));
        assert_eq!(step_selection(&candidates, Some(3), false), Some(1));
        assert_eq!(step_selection(&[], None, true), None);
    }
}

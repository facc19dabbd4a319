//! 事件处理
//!
//! 轮询 crossterm 键盘事件，Ctrl+Q 转为 Quit；其余按键交给 run_app 按当前阶段
//! 解释（输入缓冲、审批热键、回溯选择）。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::core::Command;
use crate::run::HumanDecision;

/// 应用事件：快捷键产生的 Command 或原始 KeyEvent
#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    Key(KeyEvent),
}

/// 事件处理器：持有 cmd_tx，poll 读键盘，send_* 发送命令
pub struct EventHandler {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl EventHandler {
    pub fn new(cmd_tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { cmd_tx }
    }

    pub fn poll(&self) -> anyhow::Result<Option<AppEvent>> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(self.handle_key(key)));
                }
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: KeyEvent) -> AppEvent {
        match key.code {
            KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                AppEvent::Command(Command::Quit)
            }
            _ => AppEvent::Key(key),
        }
    }

    pub fn send_ask(&self, question: String, with_chart: bool) {
        let _ = self.cmd_tx.send(Command::Ask {
            question,
            with_chart,
        });
    }

    pub fn send_decide(&self, decision: HumanDecision) {
        let _ = self.cmd_tx.send(Command::Decide(decision));
    }

    pub fn send_retry(&self) {
        let _ = self.cmd_tx.send(Command::Retry);
    }

    pub fn send_quit(&self) {
        let _ = self.cmd_tx.send(Command::Quit);
    }
}

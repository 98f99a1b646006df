/// ログ出力Observerアダプタ
///
/// Presentation層の代替として状態遷移をログに出力する。
/// Controllerはレンダリング面に触れないため、バイナリではこれが通知先になる。

use crate::domain::{SessionObserver, SessionSnapshot, SessionState};

/// 状態遷移をtracingへ出力するObserver
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn on_transition(&self, snapshot: &SessionSnapshot) {
        match snapshot.state {
            SessionState::Detected => {
                let document_bytes = snapshot
                    .last_result
                    .as_ref()
                    .and_then(|r| r.document.as_ref().map(|d| d.len()))
                    .unwrap_or(0);
                tracing::info!(
                    "Session transition: state={:?}, document_bytes={}",
                    snapshot.state,
                    document_bytes
                );
            }
            SessionState::Failed => {
                tracing::error!(
                    "Session transition: state={:?}, error={:?}",
                    snapshot.state,
                    snapshot.error
                );
            }
            _ => {
                tracing::debug!(
                    "Session transition: state={:?}, pending={}, timer={}, error={:?}",
                    snapshot.state,
                    snapshot.pending_requests,
                    snapshot.scan_timer_active,
                    snapshot.error
                );
            }
        }
    }
}

//! Errors - リレーのエラー型と分類
//!
//! メッセージ単位のエラーは必ずそのメッセージの境界で止まり、
//! バッチやループを中断させません。呼び出し側（バッチ or 直接呼び出し）
//! によって、握りつぶすか返すかだけが変わります。

use super::message::MessageId;
use super::product::ValidationError;
use crate::ports::{ForwardError, QueueError};

/// ErrorKind は運用上の分類
///
/// - Transient: 一時的なエラー（キュー障害、下流の 5xx など）
/// - Permanent: この配送では回復しないエラー（壊れた本文、下流の 4xx）
/// - Precondition: 呼び出し境界での前提違反（必須項目欠落、設定ミス）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Precondition,
}

/// RelayError は 1 メッセージの処理結果としてのエラー
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("message {message_id} could not be decoded: {source}")]
    Decode {
        message_id: MessageId,
        #[source]
        source: serde_json::Error,
    },

    #[error("message {message_id} carries an invalid record: {source}")]
    Invalid {
        message_id: MessageId,
        #[source]
        source: ValidationError,
    },

    #[error("message {message_id} could not be forwarded: {source}")]
    Forward {
        message_id: MessageId,
        #[source]
        source: ForwardError,
    },

    #[error("queue operation failed: {0}")]
    Queue(#[from] QueueError),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::Decode { .. } => ErrorKind::Permanent,
            RelayError::Invalid { .. } => ErrorKind::Precondition,
            RelayError::Forward { source, .. } => source.kind(),
            RelayError::Queue(_) => ErrorKind::Transient,
        }
    }

    /// 対象メッセージの ID（キュー操作の失敗では None）
    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            RelayError::Decode { message_id, .. }
            | RelayError::Invalid { message_id, .. }
            | RelayError::Forward { message_id, .. } => Some(message_id),
            RelayError::Queue(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_are_permanent() {
        let source = serde_json::from_str::<serde_json::Value>("invalid-json").unwrap_err();
        let err = RelayError::Decode {
            message_id: MessageId::new("m-1"),
            source,
        };
        assert_eq!(err.kind(), ErrorKind::Permanent);
        assert_eq!(err.message_id(), Some(&MessageId::new("m-1")));
        assert!(err.to_string().contains("m-1"));
    }

    #[test]
    fn validation_errors_are_precondition_violations() {
        let err = RelayError::Invalid {
            message_id: MessageId::new("m-2"),
            source: ValidationError::BlankName,
        };
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn forward_errors_take_the_kind_of_their_source() {
        let transient = RelayError::Forward {
            message_id: MessageId::new("m-3"),
            source: ForwardError::Transport("connection refused".into()),
        };
        let rejected = RelayError::Forward {
            message_id: MessageId::new("m-3"),
            source: ForwardError::Status {
                status: 400,
                body: "bad".into(),
            },
        };
        assert_eq!(transient.kind(), ErrorKind::Transient);
        assert_eq!(rejected.kind(), ErrorKind::Permanent);
    }

    #[test]
    fn queue_errors_are_transient() {
        let err = RelayError::from(QueueError::Transport("timeout".into()));
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.message_id().is_none());
    }
}

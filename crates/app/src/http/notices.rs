use spiral_core::ports::{Notice, NoticeLevel};
use spiral_core::types::PostId;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

/// Collects the notices a view raises while one request runs, so they can be
/// returned with the response.
#[derive(Debug)]
pub struct NoticeSink {
    sender: UnboundedSender<Notice>,
    receiver: UnboundedReceiver<Notice>,
}

impl NoticeSink {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded_channel();
        Self { sender, receiver }
    }

    pub fn notifier(&self) -> &UnboundedSender<Notice> {
        &self.sender
    }

    pub fn drain(&mut self, post_id: &PostId) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.receiver.try_recv() {
            match notice.level {
                NoticeLevel::Success => {
                    info!(post_id = %post_id, message = %notice.message, "spiral notice")
                }
                NoticeLevel::Error => {
                    warn!(post_id = %post_id, message = %notice.message, "spiral notice")
                }
            }
            notices.push(notice);
        }
        notices
    }
}

impl Default for NoticeSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use spiral_core::ports::{Notice, Notifier};
    use spiral_core::types::PostId;

    use super::NoticeSink;

    #[test]
    fn drain_returns_notices_in_order_and_empties_the_sink() {
        let mut sink = NoticeSink::new();
        sink.notifier().notify(Notice::error("first"));
        sink.notifier().notify(Notice::success("second"));
        let post_id = PostId::try_from("p1").unwrap();
        let drained = sink.drain(&post_id);
        assert_eq!(drained, vec![Notice::error("first"), Notice::success("second")]);
        assert!(sink.drain(&post_id).is_empty());
    }
}

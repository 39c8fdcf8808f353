//! Debounced persistence of note edits.
//!
//! Edits arrive on a bounded queue. The writer keeps at most one pending
//! item: a newer edit of the same note replaces it and restarts the quiet
//! period, an edit of a different note flushes it first. The pending item is
//! written once the quiet period passes without another edit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, warn};

use nervos_shared::Item;

use crate::error::{ClientError, Result};
use crate::state::Context;

/// Queue depth between editors and the writer loop.
pub const QUEUE_CAPACITY: usize = 100;

/// Destination of debounced writes.
pub trait ItemSink: Send + Sync + 'static {
    fn save(&self, item: &Item) -> Result<()>;
}

#[derive(Debug)]
pub enum WriterCommand {
    Edit(Item),
    /// Write the pending item now and acknowledge.
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<WriterCommand>,
}

/// Create the queue between [`WriterHandle`] and [`run_writer`].
pub fn channel() -> (WriterHandle, mpsc::Receiver<WriterCommand>) {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    (WriterHandle { tx }, rx)
}

impl WriterHandle {
    /// Queue an edited item. Waits when the queue is full.
    pub async fn submit(&self, item: Item) -> Result<()> {
        self.tx
            .send(WriterCommand::Edit(item))
            .await
            .map_err(|_| ClientError::Task("writer stopped".into()))
    }

    /// Persist whatever is pending and wait until it is written.
    pub async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(WriterCommand::Flush(ack_tx))
            .await
            .map_err(|_| ClientError::Task("writer stopped".into()))?;
        ack_rx
            .await
            .map_err(|_| ClientError::Task("writer stopped".into()))
    }
}

/// Run until every [`WriterHandle`] is dropped; the pending item is written
/// before returning.
pub async fn run_writer(
    rx: &mut mpsc::Receiver<WriterCommand>,
    sink: Arc<dyn ItemSink>,
    delay: Duration,
) {
    let mut pending: Option<Item> = None;
    let timer = sleep(delay);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(WriterCommand::Edit(item)) => {
                    if let Some(previous) = pending.take() {
                        if previous.id != item.id {
                            persist(sink.as_ref(), previous);
                        }
                    }
                    pending = Some(item);
                    timer.as_mut().reset(Instant::now() + delay);
                }
                Some(WriterCommand::Flush(ack)) => {
                    if let Some(item) = pending.take() {
                        persist(sink.as_ref(), item);
                    }
                    let _ = ack.send(());
                }
                None => {
                    if let Some(item) = pending.take() {
                        persist(sink.as_ref(), item);
                    }
                    debug!("Writer queue closed");
                    return;
                }
            },
            () = &mut timer, if pending.is_some() => {
                if let Some(item) = pending.take() {
                    persist(sink.as_ref(), item);
                }
            }
        }
    }
}

fn persist(sink: &dyn ItemSink, item: Item) {
    if item.id == 0 {
        return;
    }
    match sink.save(&item) {
        Ok(()) => debug!(id = item.id, rev = item.rev, "Saved note"),
        Err(e) => error!(id = item.id, error = %e, "Failed to save note"),
    }
}

/// Writes go to the local store, unless sync has meanwhile adopted a newer
/// revision of the same note (which it persisted itself).
impl ItemSink for Context {
    fn save(&self, item: &Item) -> Result<()> {
        let state = self.state()?;
        let keys = state.keys.clone().ok_or(ClientError::Locked)?;

        if let Some(current) = state.items.get(&item.id) {
            if current.rev > item.rev {
                warn!(id = item.id, "Dropping stale edit");
                return Ok(());
            }
        }

        let result = self.db()?.save_item(keys.data_secret(), item);
        drop(state);
        result.map_err(|e| {
            self.record_error(format!("saving: {e}"));
            e.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::state::tests::unlocked_context;

    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<Item>>,
    }

    impl RecordingSink {
        fn writes(&self) -> Vec<Item> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl ItemSink for RecordingSink {
        fn save(&self, item: &Item) -> Result<()> {
            self.writes.lock().unwrap().push(item.clone());
            Ok(())
        }
    }

    fn item(id: i64, rev: i64, data: &str) -> Item {
        Item {
            id,
            rev,
            data: data.to_string(),
        }
    }

    fn start(sink: Arc<RecordingSink>) -> (WriterHandle, tokio::task::JoinHandle<()>) {
        let (handle, mut rx) = channel();
        let task = tokio::spawn(async move {
            run_writer(&mut rx, sink, Duration::from_secs(1)).await;
        });
        (handle, task)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_coalesce() {
        let sink = Arc::new(RecordingSink::default());
        let (writer, _task) = start(sink.clone());

        writer.submit(item(7, 1, "h")).await.unwrap();
        sleep(Duration::from_millis(80)).await;
        writer.submit(item(7, 2, "he")).await.unwrap();
        sleep(Duration::from_millis(80)).await;
        writer.submit(item(7, 3, "hey")).await.unwrap();

        sleep(Duration::from_millis(500)).await;
        assert!(sink.writes().is_empty());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.writes(), vec![item(7, 3, "hey")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_items_flushes_previous() {
        let sink = Arc::new(RecordingSink::default());
        let (writer, _task) = start(sink.clone());

        writer.submit(item(1, 1, "x")).await.unwrap();
        writer.submit(item(2, 2, "y")).await.unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(sink.writes(), vec![item(1, 1, "x")]);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.writes(), vec![item(1, 1, "x"), item(2, 2, "y")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_id_never_written() {
        let sink = Arc::new(RecordingSink::default());
        let (writer, _task) = start(sink.clone());

        writer.submit(item(0, 5, "ghost")).await.unwrap();
        sleep(Duration::from_secs(2)).await;
        assert!(sink.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_and_close_write_pending() {
        let sink = Arc::new(RecordingSink::default());
        let (writer, task) = start(sink.clone());

        writer.submit(item(1, 1, "a")).await.unwrap();
        writer.flush().await.unwrap();
        assert_eq!(sink.writes().len(), 1);

        writer.submit(item(1, 2, "ab")).await.unwrap();
        drop(writer);
        task.await.unwrap();
        assert_eq!(sink.writes(), vec![item(1, 1, "a"), item(1, 2, "ab")]);
    }

    #[test]
    fn test_context_sink_skips_stale_edit() {
        let ctx = unlocked_context();
        let note = ctx.create_note().unwrap();
        let edited = ctx.edit_note(note.id, "old").unwrap().unwrap();

        // Sync adopted a newer remote revision in the meantime.
        ctx.state()
            .unwrap()
            .items
            .insert(note.id, item(note.id, edited.rev + 10, "remote"));

        ctx.save(&edited).unwrap();
        let keys = ctx.keys().unwrap();
        let stored = ctx
            .db()
            .unwrap()
            .get_item(keys.data_secret(), note.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.data, "");
    }

    #[test]
    fn test_context_sink_writes_current_edit() {
        let ctx = unlocked_context();
        let note = ctx.create_note().unwrap();
        let edited = ctx.edit_note(note.id, "body").unwrap().unwrap();

        ctx.save(&edited).unwrap();
        let keys = ctx.keys().unwrap();
        let stored = ctx.db().unwrap().get_item(keys.data_secret(), note.id).unwrap();
        assert_eq!(stored, Some(edited));
    }
}

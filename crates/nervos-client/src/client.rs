//! Entry point for embedding hosts: owns the context and the background
//! tasks.

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::info;
use zeroize::Zeroizing;

use nervos_shared::Item;
use nervos_store::Database;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::state::{Context, Phase};
use crate::sync::{run_sync_loop, sync_once, SyncClient, SyncStats};
use crate::tasks::spawn_supervised;
use crate::writer::{self, run_writer, ItemSink, WriterHandle};

pub struct Client {
    ctx: Context,
    sync: SyncClient,
    writer: WriterHandle,
    writer_task: JoinHandle<()>,
    sync_task: JoinHandle<()>,
}

impl Client {
    /// Open the local store and start the sync loop and debounced writer.
    /// Must be called from within a Tokio runtime.
    pub fn open(config: ClientConfig) -> Result<Self> {
        let db = match &config.db_path {
            Some(path) => Database::open_at(path)?,
            None => Database::open_default()?,
        };
        let ctx = Context::new(db)?;
        let sync = SyncClient::new(&config)?;

        let (writer, rx) = writer::channel();
        let rx = Arc::new(AsyncMutex::new(rx));
        let sink: Arc<dyn ItemSink> = Arc::new(ctx.clone());
        let save_delay = config.save_delay;
        let writer_task = spawn_supervised("writer", ctx.clone(), move || {
            let rx = rx.clone();
            let sink = sink.clone();
            async move {
                let mut rx = rx.lock().await;
                run_writer(&mut rx, sink, save_delay).await;
            }
        });

        let sync_task = {
            let ctx = ctx.clone();
            let sync = sync.clone();
            spawn_supervised("sync", ctx.clone(), move || {
                run_sync_loop(ctx.clone(), sync.clone(), config.clone())
            })
        };

        info!(phase = ?ctx.phase(), "Client opened");
        Ok(Self {
            ctx,
            sync,
            writer,
            writer_task,
            sync_task,
        })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn phase(&self) -> Phase {
        self.ctx.phase()
    }

    pub async fn login(&self, username: &str, password: Zeroizing<String>) -> Result<()> {
        self.ctx.login(username, password).await
    }

    pub async fn unlock(&self, password: Zeroizing<String>) -> Result<()> {
        self.ctx.unlock(password).await
    }

    /// Persist pending edits, then forget the secrets.
    pub async fn lock(&self) -> Result<()> {
        self.writer.flush().await?;
        self.ctx.lock()
    }

    pub fn create_note(&self) -> Result<Item> {
        self.ctx.create_note()
    }

    /// Update a note in memory and queue it for a debounced write.
    pub async fn edit_note(&self, id: i64, text: &str) -> Result<()> {
        if let Some(item) = self.ctx.edit_note(id, text)? {
            self.writer.submit(item).await?;
        }
        Ok(())
    }

    pub fn note(&self, id: i64) -> Result<Option<Item>> {
        self.ctx.note(id)
    }

    pub fn search(&self, query: &str) -> Result<Vec<Item>> {
        self.ctx.search(query)
    }

    /// Write pending edits now.
    pub async fn flush(&self) -> Result<()> {
        self.writer.flush().await
    }

    /// Run a sync cycle immediately, outside the regular schedule.
    pub async fn sync_now(&self) -> Result<SyncStats> {
        sync_once(&self.ctx, &self.sync).await
    }

    pub fn last_error(&self) -> Option<String> {
        self.ctx.last_error()
    }

    pub fn take_error(&self) -> Option<String> {
        self.ctx.take_error()
    }

    /// Flush the writer and stop the background tasks.
    pub async fn shutdown(self) -> Result<()> {
        self.sync_task.abort();
        self.writer.flush().await?;
        drop(self.writer);
        let _ = self.writer_task.await;
        info!("Client shut down");
        Ok(())
    }
}

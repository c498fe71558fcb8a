//! Handling of the host process exit.
//!
//! An [`AppExit`] is created once by the loader and cloned into every long-running task. Tasks
//! either await [`AppExit::recv_exit`] or run their loop through [`loop_select_exiting!`].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{Context, Result};
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct AppExit {
    sender: broadcast::Sender<()>,
    exiting: Arc<AtomicBool>,
}

impl Default for AppExit {
    fn default() -> Self {
        AppExit { sender: broadcast::channel(2).0, exiting: Arc::new(AtomicBool::new(false)) }
    }
}

impl AppExit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify all listening tasks of the termination of the host process.
    pub fn send_exit(&self) -> Result<()> {
        self.exiting.store(true, Ordering::SeqCst);
        if self.sender.receiver_count() > 0 {
            self.sender.send(()).context("Failed to send exit lifecycle event")?;
        }
        Ok(())
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Yields once the process is terminating. Returns immediately when that already happened.
    pub async fn recv_exit(&self) -> Result<()> {
        let mut recv = self.subscribe();
        if self.is_exiting() {
            return Ok(());
        }
        recv.recv().await.context("Failed to receive lifecycle event")
    }
}

/// Select in a loop, breaking once the given [`AppExit`] fires.
#[macro_export]
macro_rules! loop_select_exiting {
    ($exit:expr, $($content:tt)*) => {{
        let exit = $exit.clone();
        let mut exit_recv = exit.subscribe();
        loop {
            if exit.is_exiting() {
                break;
            }
            tokio::select! {
                _ = exit_recv.recv() => {
                    break;
                }
                $($content)*
            }
        }
    }};
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_exit_reaches_late_listeners() {
        let exit = AppExit::new();
        exit.send_exit().unwrap();
        tokio::time::timeout(Duration::from_millis(100), exit.recv_exit()).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_loop_select_exiting_breaks() {
        let exit = AppExit::new();
        let (send, mut recv) = tokio::sync::mpsc::unbounded_channel::<u32>();
        let task = {
            let exit = exit.clone();
            tokio::spawn(async move {
                let mut seen = 0;
                loop_select_exiting!(exit,
                    Some(_) = recv.recv() => {
                        seen += 1;
                    }
                );
                seen
            })
        };
        send.send(1).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        exit.send_exit().unwrap();
        assert_eq!(tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap(), 1);
    }
}

//! Re-arming delta poll timer

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A single scheduled task that runs `tick` a fixed interval after the
/// previous tick finished, while the target view is visible.
///
/// Visibility is checked when the timer fires, not when it is armed. While
/// hidden the task parks until the view becomes visible again and then
/// waits a full interval before the next tick. Dropping the poller cancels
/// the task.
pub struct Poller {
    handle: JoinHandle<()>
}

impl Poller {
    pub fn start<F, Fut>(interval: Duration, mut visible: watch::Receiver<bool>, mut tick: F) -> Poller
            where F: FnMut() -> Fut + Send + 'static,
                  Fut: Future<Output = ()> + Send + 'static {
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let is_visible = *visible.borrow_and_update();
                if !is_visible {
                    log::debug!("Resource view hidden, polling suspended");
                    let resumed = visible.wait_for(|v| *v).await.is_ok();
                    if !resumed {
                        break;
                    }
                    log::debug!("Resource view visible, polling resumed");
                    continue;
                }

                tick().await;
            }
            log::debug!("Poller stopped");
        });
        Poller { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

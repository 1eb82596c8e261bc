use tokio::sync::watch;

/// A one-way abort flag that can be awaited.
#[derive(Debug)]
pub(crate) struct AbortSignal(watch::Sender<bool>);

impl Default for AbortSignal {
    fn default() -> Self {
        Self(watch::Sender::new(false))
    }
}

impl AbortSignal {
    /// Raise the flag. Idempotent.
    pub fn abort(&self) {
        self.0.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the flag is raised, immediately if it already is.
    pub async fn aborted(&self) {
        let mut rx = self.0.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // the sender lives in self, so this cannot happen while
                // we are borrowed
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn resolves_when_raised_before() {
        let signal = AbortSignal::default();
        signal.abort();
        assert!(signal.is_aborted());
        tokio::time::timeout(Duration::from_secs(1), signal.aborted())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn resolves_when_raised_after() {
        let signal = std::sync::Arc::new(AbortSignal::default());
        let s2 = signal.clone();
        let task = tokio::spawn(async move { s2.aborted().await });
        tokio::task::yield_now().await;
        assert!(!task.is_finished());
        signal.abort();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}

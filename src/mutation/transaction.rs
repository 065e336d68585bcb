//! Optimistic change with an explicit outcome

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    Pending,
    Committed,
    RolledBack
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TxState::Pending => "pending",
            TxState::Committed => "committed",
            TxState::RolledBack => "rolled back"
        };
        write!(f, "{}", s)
    }
}

type Undo = Box<dyn FnOnce() + Send>;

/// `pending -> committed | rolled back`.
///
/// The optimistic change is applied by the caller before the transaction is
/// opened; the transaction only owns the way back. A transaction dropped
/// while still pending is rolled back, so an early return or a cancelled
/// future cannot leave the optimistic state behind.
pub struct Transaction {
    label: String,
    state: TxState,
    undo: Option<Undo>
}

impl Transaction {
    pub fn pending<F>(label: impl Into<String>, undo: F) -> Transaction
            where F: FnOnce() + Send + 'static {
        Transaction { label: label.into(), state: TxState::Pending, undo: Some(Box::new(undo)) }
    }

    /// For writes with nothing to apply ahead of the server
    pub fn without_undo(label: impl Into<String>) -> Transaction {
        Transaction { label: label.into(), state: TxState::Pending, undo: None }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn commit(mut self) -> TxState {
        self.undo = None;
        self.state = TxState::Committed;
        log::debug!("{}: committed", self.label);
        self.state
    }

    pub fn rollback(mut self) -> TxState {
        self.run_undo();
        self.state
    }

    fn run_undo(&mut self) {
        if let Some(undo) = self.undo.take() {
            undo();
        }
        self.state = TxState::RolledBack;
        log::debug!("{}: rolled back", self.label);
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state == TxState::Pending {
            self.run_undo();
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("label", &self.label)
            .field("state", &self.state)
            .finish()
    }
}

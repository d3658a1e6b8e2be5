//! Process-wide sink for user-visible status messages.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Identifies a registered outputter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputterId(u64);

type Outputter = Arc<dyn Fn(&str) + Send + Sync>;

/// Status message sink.
///
/// Every message is logged through `tracing` under the `vrkit::status`
/// target and then handed to each outputter in registration order.
pub struct Status {
    outputters: Mutex<Outputters>,
}

#[derive(Default)]
struct Outputters {
    next_id: u64,
    list: Vec<(OutputterId, Outputter)>,
}

impl Status {
    /// The shared sink, created on first use.
    pub fn instance() -> &'static Status {
        static INSTANCE: OnceLock<Status> = OnceLock::new();
        INSTANCE.get_or_init(|| Status {
            outputters: Mutex::new(Outputters::default()),
        })
    }

    pub fn add_outputter<O>(&self, outputter: O) -> OutputterId
    where
        O: Fn(&str) + Send + Sync + 'static,
    {
        let mut outputters = self.lock();
        let id = OutputterId(outputters.next_id);
        outputters.next_id += 1;
        outputters.list.push((id, Arc::new(outputter)));
        id
    }

    pub fn remove_outputter(&self, id: OutputterId) -> bool {
        let mut outputters = self.lock();
        let before = outputters.list.len();
        outputters.list.retain(|(oid, _)| *oid != id);
        outputters.list.len() != before
    }

    pub fn write(&self, message: &str) {
        tracing::info!(target: "vrkit::status", "{}", message);

        // Outputters may write status themselves.
        let outputters: Vec<Outputter> = self.lock().list.iter().map(|(_, o)| o.clone()).collect();
        for outputter in outputters {
            outputter(message);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Outputters> {
        self.outputters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Write a formatted message to the shared [`Status`] sink.
#[macro_export]
macro_rules! vrkit_status {
    ($($arg:tt)*) => {
        $crate::Status::instance().write(&format!($($arg)*))
    };
}

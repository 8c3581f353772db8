use super::state::TerminationReason;

#[derive(Debug, Clone)]
pub enum Progress {
    SearchStart { max_iterations: u64 },

    IterationStart { iteration: usize },
    BatchScored { proposed: usize, evaluated: usize },
    IterationFinish {
        iteration: usize,
        best_score: Option<f64>,
        frontier_size: usize,
    },

    SearchFinish { reason: TerminationReason },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

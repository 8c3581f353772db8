use directevo::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Drives one iteration bar for a search; the message shows the current best score.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.disable_steady_tick();
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::SearchStart { max_iterations } => {
                    pb_guard.reset();
                    pb_guard.set_length(max_iterations);
                    pb_guard.set_position(0);
                    pb_guard.set_style(Self::bar_style());
                    pb_guard.set_message("Searching");
                }
                Progress::IterationStart { iteration } => {
                    pb_guard.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb_guard.set_message(format!("Iteration {iteration}"));
                }
                Progress::BatchScored {
                    proposed,
                    evaluated,
                } => {
                    if evaluated < proposed {
                        pb_guard.println(format!(
                            "  {} of {} candidates could not be scored",
                            proposed - evaluated,
                            proposed
                        ));
                    }
                }
                Progress::IterationFinish {
                    iteration,
                    best_score,
                    frontier_size,
                } => {
                    pb_guard.disable_steady_tick();
                    pb_guard.set_position(iteration as u64);
                    let best = best_score.map_or_else(|| "-".to_string(), |s| format!("{s:.4}"));
                    pb_guard.set_message(format!("best {best} ({frontier_size} kept)"));
                }
                Progress::SearchFinish { reason } => {
                    pb_guard.disable_steady_tick();
                    pb_guard.finish_with_message(format!("✓ {reason}"));
                }
                Progress::Message(msg) => {
                    if !pb_guard.is_finished() {
                        pb_guard.println(format!("  {}", msg));
                    } else {
                        pb_guard.set_message(msg);
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .expect("Failed to create spinner style template")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg} ({eta})")
            .expect("Failed to create bar style template")
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use directevo::engine::state::TerminationReason;
    use std::thread;

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new();
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.length(), Some(0));
        assert!(pb.is_finished());
    }

    #[test]
    fn callback_tracks_iterations() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::SearchStart { max_iterations: 20 });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.length(), Some(20));
            assert_eq!(pb.position(), 0);
            assert!(!pb.is_finished());
        }

        callback(Progress::IterationStart { iteration: 1 });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.message(), "Iteration 1");
        }

        callback(Progress::BatchScored {
            proposed: 10,
            evaluated: 10,
        });
        callback(Progress::IterationFinish {
            iteration: 1,
            best_score: Some(1.5),
            frontier_size: 3,
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.position(), 1);
            assert_eq!(pb.message(), "best 1.5000 (3 kept)");
        }

        callback(Progress::SearchFinish {
            reason: TerminationReason::Converged,
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert!(pb.is_finished());
            assert_eq!(pb.message(), "✓ CONVERGED");
        }
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::SearchStart { max_iterations: 2 });
            callback(Progress::IterationStart { iteration: 1 });
            callback(Progress::SearchFinish {
                reason: TerminationReason::ExhaustedSpace,
            });
        })
        .join()
        .unwrap();

        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✓ EXHAUSTED_SPACE");
    }
}

//! Console progress for a coordinator run.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use demtile::coordinator::{PhaseObserver, RunPhase};
use demtile::pool::{TileOutcome, TileProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

/// Prints each phase as it starts and shows a bar while tiles run.
#[derive(Clone, Default)]
pub struct RunProgress {
    bar: Arc<Mutex<Option<ProgressBar>>>,
    quiet: bool,
}

impl RunProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Arc::default(),
            quiet,
        }
    }

    fn start_bar(&self) {
        if self.quiet {
            return;
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("  {spinner} [{elapsed_precise}] {wide_bar} {pos}/{len} tiles")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(200));
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn on_phase(&self, phase: RunPhase) {
        match phase {
            RunPhase::Distributing => {
                println!("==> {}", phase);
                self.start_bar();
            }
            RunPhase::Joined => self.finish_bar(),
            RunPhase::Complete => {}
            _ => println!("==> {}", phase),
        }
    }

    fn on_tile(&self, done: usize, total: usize, outcome: &TileOutcome) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_length(total as u64);
                bar.set_position(done as u64);
                if !outcome.is_success() {
                    bar.println(format!("  tile {} failed", outcome.tile.name()));
                }
            }
        }
    }

    pub fn phase_observer(&self) -> Arc<PhaseObserver> {
        let this = self.clone();
        Arc::new(move |phase: RunPhase| this.on_phase(phase))
    }

    pub fn tile_callback(&self) -> Arc<TileProgressCallback> {
        let this = self.clone();
        Arc::new(move |done: usize, total: usize, outcome: &TileOutcome| {
            this.on_tile(done, total, outcome)
        })
    }
}

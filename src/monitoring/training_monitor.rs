use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One row of the episode log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// 1-based episode number.
    pub episode: usize,
    pub total_reward: f64,
    pub epsilon: f64,
    /// Mean reward over the trailing window; empty until the window is full.
    pub moving_average: Option<f64>,
    pub presenting: bool,
    /// The episode was cut short by a stop request; `total_reward` covers the steps run.
    pub stopped: bool,
}

/// Generic helper to append a record to a CSV file, writing headers for a new file.
fn log_to_csv<T: Serialize>(path: &Path, record: &T) -> Result<(), csv::Error> {
    let file_exists = path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

/// Appends per-episode results to a CSV file for external plotting.
#[derive(Debug, Clone)]
pub struct EpisodeLogger {
    path: PathBuf,
}

impl EpisodeLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&self, record: &EpisodeRecord) -> Result<(), csv::Error> {
        log_to_csv(&self.path, record)
    }
}

/// Reads back every record of an episode log.
pub fn read_episode_log(path: impl AsRef<Path>) -> Result<Vec<EpisodeRecord>, csv::Error> {
    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);
    rdr.deserialize().collect()
}

/// Mean of the last `window` values, once that many exist.
pub fn moving_average(history: &[f64], window: usize) -> Option<f64> {
    if window == 0 || history.len() < window {
        return None;
    }
    let tail = &history[history.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Mean of the last `count` values (fewer if the history is shorter).
pub fn trailing_mean(history: &[f64], count: usize) -> Option<f64> {
    let take = count.min(history.len());
    if take == 0 {
        return None;
    }
    let tail = &history[history.len() - take..];
    Some(tail.iter().sum::<f64>() / take as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_waits_for_full_window() {
        let history = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(moving_average(&history, 5), None);
        assert_eq!(moving_average(&history, 2), Some(3.5));
        assert_eq!(moving_average(&history, 0), None);
    }

    #[test]
    fn trailing_mean_uses_what_is_available() {
        assert_eq!(trailing_mean(&[], 5), None);
        assert_eq!(trailing_mean(&[2.0, 4.0], 5), Some(3.0));
        assert_eq!(trailing_mean(&[9.0, 2.0, 4.0], 2), Some(3.0));
    }

    #[test]
    fn log_appends_rows_with_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let logger = EpisodeLogger::new(dir.path().join("episodes.csv"));
        for episode in 1..=3 {
            logger
                .log(&EpisodeRecord {
                    episode,
                    total_reward: -(episode as f64),
                    epsilon: 0.5,
                    moving_average: (episode == 3).then_some(-2.0),
                    presenting: false,
                    stopped: episode == 3,
                })
                .unwrap();
        }

        let records = read_episode_log(logger.path()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].moving_average, None);
        assert_eq!(records[2].moving_average, Some(-2.0));
        assert_eq!(records[1].total_reward, -2.0);
        assert!(records[2].stopped && !records[1].stopped);
    }
}

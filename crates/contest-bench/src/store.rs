use std::fs;
use std::path::{Path, PathBuf};

use contest_core::model::{JudgeId, ScoreRecord};
use contest_core::{CompositeScore, CompositeSink, EngineError, PairAward, Snapshot};
use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read snapshot {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse snapshot {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Shared record set. Readers get an owned copy to compute on; write-backs
/// take the write lock for their whole delete-then-insert sequence.
pub struct RecordStore {
    inner: RwLock<Snapshot>,
}

impl RecordStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| StoreError::Read {
            source,
            path: path.to_path_buf(),
        })?;
        let snapshot = Snapshot::from_json(&json).map_err(|source| StoreError::Parse {
            source,
            path: path.to_path_buf(),
        })?;
        Ok(Self::new(snapshot))
    }

    /// Consistent copy of the current records.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.read().clone()
    }

    pub fn record_count(&self) -> usize {
        self.inner.read().records().count()
    }
}

impl CompositeSink for &RecordStore {
    type Error = StoreError;

    fn replace_composite(&mut self, composite: &CompositeScore) -> Result<ScoreRecord, StoreError> {
        let mut guard = self.inner.write();
        Ok(guard.replace_composite(composite)?)
    }

    fn record_pair_awards(&mut self, awards: &[PairAward], judge: &JudgeId) -> Result<usize, StoreError> {
        let mut guard = self.inner.write();
        Ok(guard.record_pair_awards(awards, judge)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contest_core::model::{Competition, ExamItem, ExecutiveScore, Round, RoundKind};
    use contest_core::{composite_scores, publish_composites};

    fn store(representative: Option<&str>) -> RecordStore {
        let mut competition = Competition::new("CT010", "Store");
        competition.contestants = vec!["A".into()];
        competition.rounds = vec![Round {
            id: "TOP".into(),
            name: "Top".into(),
            order: 1,
            kind: RoundKind::ExecutiveCutoff { top_limit: 1 },
        }];
        let mut item = ExamItem::points("TOP-PANEL", "TOP", 100);
        item.representative_judge = representative.map(JudgeId::from);
        competition.items = vec![item];
        let mut snapshot = Snapshot::new(competition);
        snapshot.submit_executive_score(ExecutiveScore {
            executive: "E1".into(),
            contestant: "A".into(),
            score: 77,
        });
        RecordStore::new(snapshot)
    }

    #[test]
    fn composite_write_back_is_visible_to_later_snapshots() {
        let store = store(Some("BGD-PANEL"));
        let composites = composite_scores(&store.snapshot(), &"TOP".into()).unwrap();

        let mut sink = &store;
        let results = publish_composites(&mut sink, &composites);
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(store.record_count(), 1);

        let snapshot = store.snapshot();
        let record = snapshot.records().next().unwrap();
        assert_eq!(record.judge.as_str(), "BGD-PANEL");
        assert_eq!(record.points, 77.0);
    }

    #[test]
    fn ambiguous_judge_surfaces_as_store_error() {
        let store = store(None);
        let composites = composite_scores(&store.snapshot(), &"TOP".into()).unwrap();

        let mut sink = &store;
        let err = sink.replace_composite(&composites[0]).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Engine(EngineError::AmbiguousRepresentativeJudge { .. })
        ));
        assert_eq!(store.record_count(), 0);
    }

    #[test]
    fn load_reports_the_offending_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = RecordStore::load(&path).err().unwrap();
        assert!(matches!(err, StoreError::Parse { path: p, .. } if p == path));
    }
}
